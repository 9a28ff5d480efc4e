//! Newtype wrappers for string identifiers, providing compile-time type safety.
//!
//! All newtypes serialize/deserialize as plain strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance from a string.
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Return the inner string as a slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

string_newtype!(
    /// Identifier of a workspace, the scope of every generated resource name.
    WorkspaceId
);

string_newtype!(
    /// Name of the environment being started within a workspace.
    EnvName
);

string_newtype!(
    /// Identifier of the user owning a running workspace.
    OwnerId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_id_display_and_as_ref() {
        let id = WorkspaceId::new("workspace123");
        assert_eq!(id.to_string(), "workspace123");
        assert_eq!(id.as_str(), "workspace123");
        assert_eq!(AsRef::<str>::as_ref(&id), "workspace123");
    }

    #[test]
    fn workspace_id_serde_roundtrip() {
        let id = WorkspaceId::new("ws-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"ws-1\"");
        let back: WorkspaceId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn owner_id_compares_with_str() {
        let owner = OwnerId::from("alice");
        assert_eq!(owner, "alice");
        assert_eq!(owner.into_inner(), "alice");
    }
}
