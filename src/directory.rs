//! Employee directory and the per-run candidate set.
//!
//! The directory is an ordered name → address mapping seeded from the
//! configuration file. It is an ordinary value: [`EmployeeDirectory::add_employee`]
//! consumes it and hands back the updated directory, and a run only ever
//! borrows it immutably, so nothing can change the directory mid-run.

use crate::error::{ConfigError, DocumentError};
use serde::Deserialize;
use tracing::{debug, info};

/// One directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Employee {
    /// Display name, also the text searched for on each page.
    #[serde(alias = "nome")]
    pub name: String,
    #[serde(alias = "email")]
    pub address: String,
}

/// Ordered, unique-by-name employee directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmployeeDirectory {
    entries: Vec<Employee>,
}

impl EmployeeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from `(name, address)` pairs, validating each one.
    ///
    /// Later duplicates replace the address of earlier ones, keeping the
    /// position of the first occurrence.
    pub fn from_entries<I, N, A>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (N, A)>,
        N: Into<String>,
        A: Into<String>,
    {
        entries
            .into_iter()
            .try_fold(Self::new(), |dir, (name, address)| {
                dir.add_employee(name, address)
            })
    }

    /// Add an employee, or replace the address of an existing name.
    ///
    /// Only callable between runs: a run holds a shared borrow of the
    /// directory for its whole duration.
    pub fn add_employee(
        mut self,
        name: impl Into<String>,
        address: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let name = name.into().trim().to_string();
        let address = address.into().trim().to_string();

        if name.is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if !email_address::EmailAddress::is_valid(&address) {
            return Err(ConfigError::InvalidAddress { name, address });
        }

        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(existing) => {
                info!("Updating address for '{}'", name);
                existing.address = address;
            }
            None => {
                debug!("Adding employee '{}'", name);
                self.entries.push(Employee { name, address });
            }
        }
        Ok(self)
    }

    pub fn address_of(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.address.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.address_of(name).is_some()
    }

    /// Names in directory order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Employee> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every employee, in directory order. This is the default selection.
    pub fn select_all(&self) -> CandidateSet {
        CandidateSet {
            names: self.names().map(str::to_string).collect(),
        }
    }

    /// Select the given names, in the given order.
    ///
    /// Duplicates are dropped; a name missing from the directory is an error.
    pub fn select<I, S>(&self, names: I) -> Result<CandidateSet, DocumentError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut selected: Vec<String> = Vec::new();
        for name in names {
            let name = name.as_ref().trim();
            if !self.contains(name) {
                return Err(DocumentError::UnknownEmployee {
                    name: name.to_string(),
                });
            }
            if !selected.iter().any(|s| s == name) {
                selected.push(name.to_string());
            }
        }
        Ok(CandidateSet { names: selected })
    }
}

/// Build the directory from the `employees` (or `funcionarios`) value of the
/// configuration file.
///
/// Two layouts are accepted, both read in file order:
/// an array of `{ name, email }` tables, or a plain name → address table.
pub(crate) fn seed_directory(seed: Option<toml::Value>) -> Result<EmployeeDirectory, ConfigError> {
    match seed {
        None => Ok(EmployeeDirectory::new()),
        Some(list @ toml::Value::Array(_)) => {
            let employees = list.try_into::<Vec<Employee>>()?;
            EmployeeDirectory::from_entries(employees.into_iter().map(|e| (e.name, e.address)))
        }
        Some(toml::Value::Table(table)) => {
            let entries = table
                .into_iter()
                .map(|(name, value)| match value {
                    toml::Value::String(address) => Ok((name, address)),
                    other => Err(ConfigError::InvalidAddress {
                        name,
                        address: other.to_string(),
                    }),
                })
                .collect::<Result<Vec<_>, _>>()?;
            EmployeeDirectory::from_entries(entries)
        }
        Some(other) => Err(ConfigError::InvalidEmployees(format!(
            "expected an array of tables or a name = \"address\" table, found {}",
            other.type_str()
        ))),
    }
}

/// The employees selected for one run, in matching order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    names: Vec<String>,
}

impl CandidateSet {
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> EmployeeDirectory {
        EmployeeDirectory::from_entries([
            ("JOAO SILVA", "joao@example.com"),
            ("MARIA OLIVEIRA", "maria@example.com"),
            ("CARLOS", "carlos@example.com"),
        ])
        .unwrap()
    }

    #[test]
    fn keeps_insertion_order() {
        let dir = sample();
        assert_eq!(
            dir.names().collect::<Vec<_>>(),
            vec!["JOAO SILVA", "MARIA OLIVEIRA", "CARLOS"]
        );
    }

    #[test]
    fn add_employee_returns_updated_directory() {
        let dir = sample()
            .add_employee("  PEDRO ", "pedro@example.com")
            .unwrap();
        assert_eq!(dir.len(), 4);
        assert_eq!(dir.address_of("PEDRO"), Some("pedro@example.com"));
    }

    #[test]
    fn add_existing_name_replaces_address_in_place() {
        let dir = sample()
            .add_employee("MARIA OLIVEIRA", "m.oliveira@example.com")
            .unwrap();
        assert_eq!(dir.len(), 3);
        assert_eq!(dir.names().nth(1), Some("MARIA OLIVEIRA"));
        assert_eq!(
            dir.address_of("MARIA OLIVEIRA"),
            Some("m.oliveira@example.com")
        );
    }

    #[test]
    fn rejects_bad_entries() {
        assert!(matches!(
            sample().add_employee("   ", "x@example.com"),
            Err(ConfigError::EmptyName)
        ));
        assert!(matches!(
            sample().add_employee("ANA", "not an address"),
            Err(ConfigError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn select_all_follows_directory_order() {
        let set = sample().select_all();
        assert_eq!(set.names(), ["JOAO SILVA", "MARIA OLIVEIRA", "CARLOS"]);
    }

    #[test]
    fn select_keeps_given_order_and_drops_duplicates() {
        let set = sample()
            .select(["CARLOS", "JOAO SILVA", "CARLOS"])
            .unwrap();
        assert_eq!(set.names(), ["CARLOS", "JOAO SILVA"]);
    }

    #[test]
    fn select_unknown_name_fails() {
        let err = sample().select(["PEDRO"]).unwrap_err();
        assert!(matches!(err, DocumentError::UnknownEmployee { name } if name == "PEDRO"));
    }

    fn seed(src: &str, key: &str) -> Result<EmployeeDirectory, ConfigError> {
        let mut doc: toml::Table = src.parse().unwrap();
        seed_directory(doc.remove(key))
    }

    #[test]
    fn table_seed_keeps_file_order() {
        let dir = seed(
            "[funcionarios]\n\"ZE\" = \"ze@example.com\"\n\"ANA SILVA\" = \"as@example.com\"\n\"ANA\" = \"ana@example.com\"\n",
            "funcionarios",
        )
        .unwrap();
        assert_eq!(
            dir.names().collect::<Vec<_>>(),
            vec!["ZE", "ANA SILVA", "ANA"]
        );
        assert_eq!(
            dir.select_all().names(),
            ["ZE", "ANA SILVA", "ANA"]
        );
    }

    #[test]
    fn list_seed_keeps_file_order() {
        let dir = seed(
            "[[employees]]\nname = \"ZE\"\nemail = \"ze@example.com\"\n\n[[employees]]\nnome = \"ANA\"\nemail = \"ana@example.com\"\n",
            "employees",
        )
        .unwrap();
        assert_eq!(dir.names().collect::<Vec<_>>(), vec!["ZE", "ANA"]);
    }

    #[test]
    fn missing_seed_is_an_empty_directory() {
        assert!(seed("", "employees").unwrap().is_empty());
    }

    #[test]
    fn malformed_list_entry_keeps_parser_detail() {
        let err = seed(
            "[[employees]]\nname = \"ZE\"\nmail = \"ze@example.com\"\n",
            "employees",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        let msg = err.to_string();
        assert!(msg.contains("address"), "got: {msg}");
        assert!(!msg.contains("did not match any variant"), "got: {msg}");
    }

    #[test]
    fn non_string_address_in_table_is_rejected() {
        let err = seed("[funcionarios]\nZE = 42\n", "funcionarios").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidAddress { name, .. } if name == "ZE"));
    }

    #[test]
    fn scalar_seed_is_rejected() {
        let err = seed("employees = \"ZE\"\n", "employees").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEmployees(_)));
    }
}
