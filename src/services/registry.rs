use std::collections::HashSet;

use crate::{api::ApiClient, error::Result, models::FileRecord};

/// Ordered in-memory view of the user's files, newest first. At all times
/// this is the last authoritative snapshot, or that snapshot with at most
/// one speculative insert or removal awaiting confirmation.
#[derive(Debug, Default)]
pub struct FileRegistry {
    files: Vec<FileRecord>,
}

impl FileRegistry {
    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    pub fn get(&self, file_id: &str) -> Option<&FileRecord> {
        self.files.iter().find(|f| f.id == file_id)
    }

    pub fn names(&self) -> HashSet<String> {
        self.files.iter().map(|f| f.name.clone()).collect()
    }

    /// Replaces the whole sequence with the server's view, newest first.
    /// A failed load leaves an empty list rather than a silently stale one.
    pub async fn load(&mut self, client: &ApiClient, username: &str) -> Result<()> {
        match client.get_user_files(username).await {
            Ok(mut files) => {
                files.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
                self.files = files;
                Ok(())
            }
            Err(err) => {
                self.files.clear();
                Err(err)
            }
        }
    }

    /// Prepends a placeholder ahead of remote confirmation.
    pub fn optimistic_insert(&mut self, record: FileRecord) {
        self.files.insert(0, record);
    }

    /// The single reconciliation primitive: re-load converges to the
    /// authoritative sequence on success and rolls back any speculative
    /// record either way.
    pub async fn confirm_or_rollback(&mut self, client: &ApiClient, username: &str) -> Result<()> {
        self.load(client, username).await
    }

    /// Sends the rename and reconciles on success. A declined or failed
    /// rename performs no local mutation at all.
    pub async fn rename(
        &mut self,
        client: &ApiClient,
        username: &str,
        file_id: &str,
        new_unique_name: &str,
    ) -> Result<()> {
        client.rename_file(username, file_id, new_unique_name).await?;
        self.load(client, username).await
    }

    /// Removes locally first for immediate feedback, then asks the server.
    /// Both outcomes reconcile via `load`, so a declined delete cannot
    /// leave a phantom-removed record while the server still has it.
    pub async fn remove(&mut self, client: &ApiClient, username: &str, file_id: &str) -> Result<()> {
        let record = match self.get(file_id) {
            Some(record) => record.clone(),
            None => return Ok(()),
        };
        self.files.retain(|f| f.id != file_id);

        match client.delete_file(username, file_id, record.size_mb()).await {
            Ok(()) => self.load(client, username).await,
            Err(err) => {
                self.load(client, username).await.ok();
                Err(err)
            }
        }
    }
}
