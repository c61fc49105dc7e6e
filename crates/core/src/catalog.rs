//! Static description of the lines on the shop floor.
//!
//! The backend only knows lines by numeric id; names and product models
//! are fixed per installation and supplied here.

use crate::error::CoreError;
use crate::types::DbId;

/// Display information for one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDefinition {
    pub id: DbId,
    pub name: String,
    pub model: String,
}

impl LineDefinition {
    pub fn new(id: DbId, name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            model: model.into(),
        }
    }
}

/// Models built on the default five-line floor, indexed by line id.
const DEFAULT_MODELS: [(DbId, &str); 5] = [
    (1, "20RT COMPACT BR"),
    (2, "30RT STANDARD BR"),
    (3, "40RT PREMIUM BR"),
    (4, "25RT ECO BR"),
    (5, "35RT INDUSTRIAL BR"),
];

/// The fixed set of lines a sync cycle fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineCatalog {
    lines: Vec<LineDefinition>,
}

impl Default for LineCatalog {
    fn default() -> Self {
        Self::from_ids(DEFAULT_MODELS.iter().map(|(id, _)| *id))
    }
}

impl LineCatalog {
    pub fn new(lines: Vec<LineDefinition>) -> Self {
        Self { lines }
    }

    /// Build a catalog from bare ids. Known ids get their floor model;
    /// unknown ids get an empty model.
    pub fn from_ids(ids: impl IntoIterator<Item = DbId>) -> Self {
        let lines = ids
            .into_iter()
            .map(|id| {
                let model = DEFAULT_MODELS
                    .iter()
                    .find(|(known, _)| *known == id)
                    .map(|(_, model)| *model)
                    .unwrap_or_default();
                LineDefinition::new(id, format!("Linha {id}"), model)
            })
            .collect();
        Self { lines }
    }

    /// Parse a comma-separated id list such as `"1,2,3"`.
    pub fn parse_ids(raw: &str) -> Result<Self, CoreError> {
        let mut ids = Vec::new();
        for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let id: DbId = part
                .parse()
                .map_err(|_| CoreError::Validation(format!("invalid line id '{part}'")))?;
            if ids.contains(&id) {
                return Err(CoreError::Validation(format!("duplicate line id {id}")));
            }
            ids.push(id);
        }
        if ids.is_empty() {
            return Err(CoreError::Validation("at least one line id is required".into()));
        }
        Ok(Self::from_ids(ids))
    }

    pub fn lines(&self) -> &[LineDefinition] {
        &self.lines
    }

    pub fn ids(&self) -> impl Iterator<Item = DbId> + '_ {
        self.lines.iter().map(|l| l.id)
    }

    pub fn get(&self, id: DbId) -> Option<&LineDefinition> {
        self.lines.iter().find(|l| l.id == id)
    }

    /// Look up a line, failing with [`CoreError::NotFound`] when it is not
    /// part of the catalog.
    pub fn require(&self, id: DbId) -> Result<&LineDefinition, CoreError> {
        self.get(id).ok_or(CoreError::NotFound {
            entity: "ProductionLine",
            id,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn default_catalog_has_five_lines() {
        let catalog = LineCatalog::default();
        assert_eq!(catalog.ids().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
        assert_eq!(catalog.get(3).unwrap().name, "Linha 3");
        assert_eq!(catalog.get(3).unwrap().model, "40RT PREMIUM BR");
    }

    #[test]
    fn parse_ids_trims_and_skips_blanks() {
        let catalog = LineCatalog::parse_ids(" 2, 7 ,,").unwrap();
        assert_eq!(catalog.ids().collect::<Vec<_>>(), vec![2, 7]);
        assert_eq!(catalog.get(7).unwrap().model, "");
    }

    #[test]
    fn parse_ids_rejects_garbage_and_duplicates() {
        assert_matches!(LineCatalog::parse_ids("1,x"), Err(CoreError::Validation(_)));
        assert_matches!(LineCatalog::parse_ids("1,1"), Err(CoreError::Validation(_)));
        assert_matches!(LineCatalog::parse_ids(" , "), Err(CoreError::Validation(_)));
    }

    #[test]
    fn require_unknown_line_is_not_found() {
        let catalog = LineCatalog::default();
        assert_matches!(
            catalog.require(9),
            Err(CoreError::NotFound { entity: "ProductionLine", id: 9 })
        );
    }
}
