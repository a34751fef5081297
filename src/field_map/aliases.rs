//! Accepted header spellings per export dialect.
//!
//! Order matters: the first alias found in the header row wins. Fields that a
//! dialect never exports are simply absent from its table and resolve to
//! `None`.

use super::CanonicalField::{self, *};
use crate::catalog::SourceKind;

pub type AliasTable = &'static [(CanonicalField, &'static [&'static str])];

/// Bitwarden and Vaultwarden share the same CSV layout:
/// folder,favorite,type,name,notes,fields,reprompt,login_uri,login_username,login_password,login_totp
static BITWARDEN_ALIASES: AliasTable = &[
    (Name, &["name"]),
    (Website, &["login_uri", "uri", "url"]),
    (Username, &["login_username", "username"]),
    (Password, &["login_password", "password"]),
    (Notes, &["notes"]),
    (Folder, &["folder"]),
    (Type, &["type"]),
];

/// LastPass: url,username,password,totp,extra,name,grouping,fav
static LASTPASS_ALIASES: AliasTable = &[
    (Name, &["name"]),
    (Website, &["url"]),
    (Username, &["username"]),
    (Email, &["email"]),
    (Password, &["password"]),
    (Notes, &["extra", "notes"]),
    (Folder, &["grouping"]),
];

/// Google Password Manager / Chrome: name,url,username,password,note
static GOOGLE_ALIASES: AliasTable = &[
    (Name, &["name"]),
    (Website, &["url", "origin"]),
    (Username, &["username"]),
    (Password, &["password"]),
    (Notes, &["note", "notes"]),
];

/// Fallback for generic CSV files and any source without its own table.
static GENERIC_ALIASES: AliasTable = &[
    (Name, &["name", "title", "service", "site", "account", "item name"]),
    (
        Website,
        &[
            "website", "url", "uri", "login_uri", "site url", "web site", "address", "domain",
        ],
    ),
    (
        Username,
        &["username", "user", "user name", "login", "login_username", "login name"],
    ),
    (Email, &["email", "e-mail", "email address", "mail"]),
    (Password, &["password", "pass", "pwd", "login_password", "secret"]),
    (Notes, &["notes", "note", "comment", "comments", "extra", "description"]),
    (Folder, &["folder", "group", "category", "grouping", "collection"]),
];

pub fn aliases_for(kind: SourceKind) -> AliasTable {
    match kind {
        SourceKind::Bitwarden | SourceKind::Vaultwarden => BITWARDEN_ALIASES,
        SourceKind::Lastpass => LASTPASS_ALIASES,
        SourceKind::Google => GOOGLE_ALIASES,
        SourceKind::GenericCsv => GENERIC_ALIASES,
    }
}
