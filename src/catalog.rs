//! Static registry mapping each legacy export to its warehouse table, load
//! mode, and date columns.
//!
//! The set of files is closed: these six exports are everything the upstream
//! system produces, and the target tables are assumed to pre-exist. An
//! unregistered file name is a configuration error, not a data error.

use crate::error::LoadError;

/// How a target table absorbs a fresh file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableMode {
    /// Keyed upsert: insert staged rows, overwrite every non-key column on
    /// conflict. Newer data always wins; there is no timestamp comparison.
    Merge(&'static [&'static str]),
    /// Delete-and-reload: the table has no stable key, so each run replaces
    /// its full contents.
    Replace,
}

impl TableMode {
    pub fn key_columns(&self) -> Option<&'static [&'static str]> {
        match self {
            TableMode::Merge(key) => Some(key),
            TableMode::Replace => None,
        }
    }
}

/// One file's load contract: schema-qualified target, mode, and the columns
/// that must be coerced to calendar dates.
#[derive(Debug, Clone, Copy)]
pub struct LoadSpec {
    pub file_name: &'static str,
    pub table: &'static str,
    pub mode: TableMode,
    pub date_columns: &'static [&'static str],
}

const SPECS: &[LoadSpec] = &[
    LoadSpec {
        file_name: "ft_balance_f.csv",
        table: "ds.ft_balance_f",
        mode: TableMode::Merge(&["on_date", "account_rk"]),
        date_columns: &["on_date"],
    },
    LoadSpec {
        file_name: "ft_posting_f.csv",
        table: "ds.ft_posting_f",
        mode: TableMode::Replace,
        date_columns: &["oper_date"],
    },
    LoadSpec {
        file_name: "md_account_d.csv",
        table: "ds.md_account_d",
        mode: TableMode::Merge(&["data_actual_date", "account_rk"]),
        date_columns: &["data_actual_date", "data_actual_end_date"],
    },
    LoadSpec {
        file_name: "md_currency_d.csv",
        table: "ds.md_currency_d",
        mode: TableMode::Merge(&["currency_rk", "data_actual_date"]),
        date_columns: &["data_actual_date", "data_actual_end_date"],
    },
    LoadSpec {
        file_name: "md_exchange_rate_d.csv",
        table: "ds.md_exchange_rate_d",
        mode: TableMode::Merge(&["data_actual_date", "currency_rk"]),
        date_columns: &["data_actual_date", "data_actual_end_date"],
    },
    LoadSpec {
        file_name: "md_ledger_account_s.csv",
        table: "ds.md_ledger_account_s",
        mode: TableMode::Merge(&["ledger_account", "start_date"]),
        date_columns: &["start_date", "end_date"],
    },
];

/// Looks up the spec for a file, matching on the lowercased file name.
pub fn spec_for(file_name: &str) -> Result<&'static LoadSpec, LoadError> {
    let lowered = file_name.to_lowercase();
    SPECS
        .iter()
        .find(|spec| spec.file_name == lowered)
        .ok_or(LoadError::UnknownFile(lowered))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let spec = spec_for("FT_BALANCE_F.CSV").unwrap();
        assert_eq!(spec.table, "ds.ft_balance_f");
        assert_eq!(
            spec.mode.key_columns(),
            Some(&["on_date", "account_rk"][..])
        );
    }

    #[test]
    fn posting_table_is_delete_and_reload() {
        let spec = spec_for("ft_posting_f.csv").unwrap();
        assert_eq!(spec.mode, TableMode::Replace);
        assert_eq!(spec.mode.key_columns(), None);
        assert_eq!(spec.date_columns, &["oper_date"]);
    }

    #[test]
    fn unknown_file_is_a_configuration_error() {
        let err = spec_for("mystery.csv").unwrap_err();
        assert!(matches!(err, crate::error::LoadError::UnknownFile(_)));
        assert!(err.to_string().contains("mystery.csv"));
    }

    #[test]
    fn every_spec_targets_the_ds_schema() {
        for spec in SPECS {
            assert!(spec.table.starts_with("ds."), "{}", spec.table);
            assert!(!spec.date_columns.is_empty(), "{}", spec.file_name);
        }
    }
}
