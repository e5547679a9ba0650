use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug)]
pub struct Folder {}

/// A file or folder as returned by the children endpoint
///
#[derive(Deserialize, Debug)]
pub struct DriveItem {
    pub id: String,
    pub name: Option<String>,
    #[serde(rename = "webUrl")]
    pub web_url: Option<String>,
    #[serde(rename = "lastModifiedDateTime")]
    pub last_modified_date_time: Option<String>,
    pub size: Option<u64>,
    pub folder: Option<Folder>,
}

impl DriveItem {
    pub fn is_folder(&self) -> bool {
        self.folder.is_some()
    }
}

#[derive(Deserialize, Debug)]
pub struct Drive {
    pub id: String,
    pub name: Option<String>,
}

/// One page of a Graph collection response
///
#[derive(Deserialize)]
pub struct Collection<T> {
    #[serde(rename = "@odata.nextLink")]
    pub odata_next_link: Option<String>,
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

/// A non-folder item flattened out of a drive's tree
///
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FileDescriptor {
    pub name: Option<String>,
    pub id: String,
    #[serde(rename = "webUrl")]
    pub web_url: Option<String>,
    #[serde(rename = "lastModifiedDateTime")]
    pub last_modified_date_time: Option<String>,
    pub size: Option<u64>,
}

impl From<DriveItem> for FileDescriptor {
    fn from(item: DriveItem) -> Self {
        FileDescriptor {
            name: item.name,
            id: item.id,
            web_url: item.web_url,
            last_modified_date_time: item.last_modified_date_time,
            size: item.size,
        }
    }
}

/// Downloaded file content along with its declared content type
///
pub struct Download {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Body returned by the file content endpoint of this service
///
#[derive(Serialize, Debug)]
pub struct FileContent {
    pub file_id: String,
    pub content_type: String,
    pub extracted_text: String,
}
