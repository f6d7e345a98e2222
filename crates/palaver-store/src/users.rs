//! User record operations.

use palaver_shared::{User, UserPatch};

use crate::projection::ProjectionStore;

impl ProjectionStore {
    /// Insert or replace a user by id.
    pub fn upsert_user(&mut self, user: User) {
        self.users.insert(user.id, user);
    }

    /// Shallow-merge a partial user payload; the record is created when it
    /// does not exist yet. Returns `false` when the patch carries no id.
    pub fn merge_user(&mut self, patch: UserPatch) -> bool {
        let Some(id) = patch.id else {
            return false;
        };
        match self.users.get_mut(&id) {
            Some(user) => user.apply(patch),
            None => {
                if let Some(user) = User::from_patch(patch) {
                    self.users.insert(id, user);
                }
            }
        }
        true
    }

    pub fn get_user(&self, id: i64) -> Option<&User> {
        self.users.get(&id)
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}
