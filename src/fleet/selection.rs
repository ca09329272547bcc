// file: src/fleet/selection.rs
// version: 1.0.0
// guid: e83b1f09-6c2d-4a57-b4e8-0d9f3a7c5e16

//! Classification of user-supplied host selections

use crate::error::{MultirouterError, Result};
use std::collections::BTreeSet;
use std::net::IpAddr;

/// A host selection given either entirely by address or entirely by index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    ByAddress(BTreeSet<String>),
    ByIndex(BTreeSet<i64>),
}

impl Selection {
    /// Classify an argument list in a single pass.
    ///
    /// Every argument must be an integer, or every argument must be an IP
    /// address. A mix of both, or anything that is neither, is rejected.
    pub fn classify<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        if args.is_empty() {
            return Err(MultirouterError::selection("no hosts given"));
        }

        let mut addresses = BTreeSet::new();
        let mut indices = BTreeSet::new();

        for arg in args {
            let arg = arg.as_ref();
            if let Ok(index) = arg.parse::<i64>() {
                if !addresses.is_empty() {
                    return Err(MultirouterError::selection(
                        "cannot mix host addresses and indices",
                    ));
                }
                indices.insert(index);
            } else if arg.parse::<IpAddr>().is_ok() {
                if !indices.is_empty() {
                    return Err(MultirouterError::selection(
                        "cannot mix host addresses and indices",
                    ));
                }
                addresses.insert(arg.to_string());
            } else {
                return Err(MultirouterError::selection(format!(
                    "'{}' is neither a host address nor an index",
                    arg
                )));
            }
        }

        if indices.is_empty() {
            Ok(Selection::ByAddress(addresses))
        } else {
            Ok(Selection::ByIndex(indices))
        }
    }
}

/// Which hosts an operation should run against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The active context (the whole fleet when unscoped)
    Context,
    /// Every host in the inventory, regardless of context
    All,
    /// An explicit selection
    Hosts(Selection),
}
