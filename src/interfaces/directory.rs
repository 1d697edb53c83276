use uuid::Uuid;

use crate::domains::user::ChatUser;

/// Answers "do you know this identity's current record?".
pub trait UserDirectory: Send + Sync {
    fn find_user(&self, user_id: Uuid) -> Option<ChatUser>;
}

impl<F> UserDirectory for F
where
    F: Fn(Uuid) -> Option<ChatUser> + Send + Sync,
{
    fn find_user(&self, user_id: Uuid) -> Option<ChatUser> {
        self(user_id)
    }
}
