//! Administrative command documents sent to the server.

use entrypoint_kernel::ServiceAccount;
use mongodb::bson::{doc, Document};

/// `createUser` for the service account.
///
/// `digestPassword: true` makes the server compute the stored credential
/// from the plaintext `pwd`; the client never hashes anything.
pub fn create_user_command(account: &ServiceAccount) -> Document {
    let roles: Vec<Document> = account
        .grants()
        .into_iter()
        .map(|grant| doc! { "role": grant.role, "db": grant.db })
        .collect();

    doc! {
        "createUser": account.username.as_str(),
        "pwd": account.password.expose(),
        "roles": roles,
        "digestPassword": true,
    }
}

/// `usersInfo` for a single user on `database`.
pub fn users_info_command(database: &str, username: &str) -> Document {
    doc! {
        "usersInfo": { "user": username, "db": database },
    }
}
