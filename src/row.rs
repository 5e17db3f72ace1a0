use std::{collections::HashMap, sync::Arc};

use crate::{Error, Result};

#[derive(Debug)]
pub(crate) struct SnowflakeRow {
    pub(crate) row: Vec<Option<String>>,
    pub(crate) column_indices: Arc<HashMap<String, usize>>,
}

impl SnowflakeRow {
    /// Decodes the named column. Column names are matched case-insensitively.
    pub(crate) fn get<T: SnowflakeDecode>(&self, column_name: &str) -> Result<T> {
        let value = self
            .column_indices
            .get(&column_name.to_ascii_uppercase())
            .and_then(|index| self.row.get(*index))
            .ok_or_else(|| Error::Decode(format!("column not found: {column_name}")))?;
        T::try_decode(value)
    }
}

pub(crate) trait SnowflakeDecode: Sized {
    fn try_decode(value: &Option<String>) -> Result<Self>;
}

impl SnowflakeDecode for String {
    fn try_decode(value: &Option<String>) -> Result<Self> {
        value
            .clone()
            .ok_or_else(|| Error::Decode("value is null".into()))
    }
}

impl SnowflakeDecode for Option<String> {
    fn try_decode(value: &Option<String>) -> Result<Self> {
        Ok(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(column: &str, value: Option<&str>) -> SnowflakeRow {
        SnowflakeRow {
            row: vec![value.map(str::to_string)],
            column_indices: Arc::new(HashMap::from([(column.to_string(), 0)])),
        }
    }

    #[test]
    fn test_decode_by_name_is_case_insensitive() -> Result<()> {
        let row = row("CURRENT_ROLE", Some("SYSADMIN"));
        assert_eq!(row.get::<String>("current_role")?, "SYSADMIN");
        Ok(())
    }

    #[test]
    fn test_null_decodes_to_none_only_for_options() -> Result<()> {
        let row = row("CURRENT_WAREHOUSE", None);
        assert_eq!(row.get::<Option<String>>("CURRENT_WAREHOUSE")?, None);
        assert!(matches!(
            row.get::<String>("CURRENT_WAREHOUSE"),
            Err(Error::Decode(_))
        ));
        Ok(())
    }

    #[test]
    fn test_unknown_column() {
        let row = row("CURRENT_ROLE", Some("x"));
        assert!(matches!(row.get::<String>("MISSING"), Err(Error::Decode(_))));
    }
}
