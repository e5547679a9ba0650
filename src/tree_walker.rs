use std::future::Future;
use std::pin::Pin;
use serde::Deserialize;
use crate::errors::GraphError;
use crate::graph_manager::GraphClient;
use crate::graph_model::FileDescriptor;
use crate::token_manager::AccessToken;

/// What a listing does when the children of a folder can't be fetched
///
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum FolderErrorPolicy {
    /// Abort the whole listing with the first error
    #[default]
    Propagate,
    /// Leave the folder's subtree out, record it and carry on
    Skip,
}

/// A folder whose subtree is missing from a listing
///
#[derive(Debug)]
pub struct SkippedFolder {
    /// None for the drive root
    pub folder_id: Option<String>,
    pub error: GraphError,
}

/// Result of flattening a drive's folder tree
///
#[derive(Debug, Default)]
pub struct Listing {
    pub files: Vec<FileDescriptor>,
    /// Always empty under `FolderErrorPolicy::Propagate`
    pub skipped: Vec<SkippedFolder>,
}

type WalkFuture<'a> = Pin<Box<dyn Future<Output = Result<(), GraphError>> + Send + 'a>>;

/// Walks the folder tree of a drive and returns every file in it
///
pub struct TreeWalker<'a> {
    graph: &'a GraphClient,
    token: &'a AccessToken,
    policy: FolderErrorPolicy,
}

impl<'a> TreeWalker<'a> {

    /// Returns a new TreeWalker
    ///
    /// # Arguments
    ///
    /// * 'graph' - Graph client
    /// * 'token' - access token shared by every call of the walk
    /// * 'policy' - how to handle folders that fail to list
    pub fn new(graph: &'a GraphClient, token: &'a AccessToken, policy: FolderErrorPolicy) -> Self {
        TreeWalker { graph, token, policy }
    }

    /// Lists all files below a folder, depth first, with each folder's files in place
    /// of the folder itself
    ///
    /// # Arguments
    ///
    /// * 'drive_id' - drive to walk
    /// * 'folder_id' - folder to start from, None for the drive root
    pub async fn list_all_files(&self, drive_id: &str, folder_id: Option<&str>) -> Result<Listing, GraphError> {
        let mut listing = Listing::default();
        self.walk(drive_id, folder_id.map(str::to_string), &mut listing).await?;

        Ok(listing)
    }

    /// Appends the files of one folder to the listing, recursing into sub folders
    ///
    fn walk<'b>(&'b self, drive_id: &'b str, folder_id: Option<String>, listing: &'b mut Listing) -> WalkFuture<'b> {
        Box::pin(async move {
            let items = match self.graph.list_children(self.token, drive_id, folder_id.as_deref()).await {
                Ok(items) => items,
                Err(e) => match self.policy {
                    FolderErrorPolicy::Propagate => return Err(e),
                    FolderErrorPolicy::Skip => {
                        listing.skipped.push(SkippedFolder { folder_id, error: e });
                        return Ok(());
                    }
                },
            };

            for item in items {
                if item.is_folder() {
                    self.walk(drive_id, Some(item.id), listing).await?;
                } else {
                    listing.files.push(FileDescriptor::from(item));
                }
            }

            Ok(())
        })
    }
}
