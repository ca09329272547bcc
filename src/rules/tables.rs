// file: src/rules/tables.rs
// version: 1.0.0
// guid: 5c0a8e93-d1b6-4f27-8e4a-29f7b3c6d018

//! Managed iptables table list

/// Tables listed and snapshotted when nothing else is configured
pub const DEFAULT_TABLES: [&str; 2] = ["filter", "nat"];

/// Ordered, duplicate-free list of iptables tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSet {
    tables: Vec<String>,
}

impl Default for TableSet {
    fn default() -> Self {
        Self::new(&DEFAULT_TABLES)
    }
}

impl TableSet {
    pub fn new<S: AsRef<str>>(tables: &[S]) -> Self {
        let mut set = Self { tables: Vec::new() };
        set.add(tables);
        set
    }

    /// Append tables not already present, keeping their order
    pub fn add<S: AsRef<str>>(&mut self, tables: &[S]) {
        for table in tables {
            let table = table.as_ref().trim();
            if !table.is_empty() && !self.tables.iter().any(|t| t == table) {
                self.tables.push(table.to_string());
            }
        }
    }

    /// Remove tables by name or by position.
    ///
    /// Integer arguments are positions in the list as it stood before this
    /// call; positions past the end are ignored.
    pub fn remove<S: AsRef<str>>(&mut self, args: &[S]) {
        let mut doomed = Vec::new();
        for arg in args {
            let arg = arg.as_ref();
            match arg.parse::<i64>() {
                Ok(index) => {
                    if index >= 0 && (index as usize) < self.tables.len() {
                        doomed.push(self.tables[index as usize].clone());
                    }
                }
                Err(_) => doomed.push(arg.to_string()),
            }
        }
        self.tables.retain(|t| !doomed.contains(t));
    }

    pub fn as_slice(&self) -> &[String] {
        &self.tables
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(String::as_str)
    }

    pub fn contains(&self, table: &str) -> bool {
        self.tables.iter().any(|t| t == table)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
