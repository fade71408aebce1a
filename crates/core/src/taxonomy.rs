use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Organizational-unit code, e.g. `harbor_po`. Stands in for "the active head
/// of that unit" wherever it appears in an approval chain.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitCode(pub String);

impl UnitCode {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }
}

impl std::fmt::Display for UnitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One organizational unit: a code, a human title used when rendering status
/// lines ("the Harborside Provincial Office head"), and the unit it reports
/// to. A unit with no parent reports directly to the top-level authority.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgUnit {
    pub code: UnitCode,
    pub title: String,
    pub parent: Option<UnitCode>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TaxonomyError {
    #[error("unknown unit code `{0}`")]
    UnknownUnit(String),
    #[error("unit `{unit}` references missing parent `{parent}`")]
    MissingParent { unit: String, parent: String },
    #[error("reporting-line cycle detected at unit `{0}`")]
    Cycle(String),
    #[error("duplicate unit code `{0}`")]
    DuplicateUnit(String),
    #[error("could not parse taxonomy document: {0}")]
    Parse(String),
}

/// Static reporting-line table. Changes to organizational structure are data
/// edits (TOML), not code edits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrgTaxonomy {
    units: HashMap<String, OrgUnit>,
    top_authority_title: String,
}

impl OrgTaxonomy {
    pub fn new(
        units: Vec<OrgUnit>,
        top_authority_title: impl Into<String>,
    ) -> Result<Self, TaxonomyError> {
        let mut by_code = HashMap::new();
        for unit in units {
            let key = normalize_key(&unit.code.0);
            if by_code.insert(key, unit.clone()).is_some() {
                return Err(TaxonomyError::DuplicateUnit(unit.code.0));
            }
        }

        let taxonomy = Self { units: by_code, top_authority_title: top_authority_title.into() };
        for unit in taxonomy.units.values() {
            taxonomy.reporting_line(&unit.code)?;
        }
        Ok(taxonomy)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, TaxonomyError> {
        let file: TaxonomyFile =
            toml::from_str(raw).map_err(|error| TaxonomyError::Parse(error.to_string()))?;
        let units = file
            .units
            .into_iter()
            .map(|entry| OrgUnit {
                code: UnitCode(entry.code),
                title: entry.title,
                parent: entry.parent.map(UnitCode),
            })
            .collect();
        Self::new(units, file.top_authority)
    }

    /// Built-in demo region used by `seed` and `smoke`: three community
    /// service centers under two provincial offices, two regional divisions,
    /// and the Regional Director as the top-level authority.
    pub fn default_region() -> Self {
        let units = vec![
            OrgUnit {
                code: UnitCode::new("finance_admin_division"),
                title: "the Administrative and Finance Division chief".to_string(),
                parent: None,
            },
            OrgUnit {
                code: UnitCode::new("operations_division"),
                title: "the Operations Division chief".to_string(),
                parent: Some(UnitCode::new("finance_admin_division")),
            },
            OrgUnit {
                code: UnitCode::new("harbor_po"),
                title: "the Harborside Provincial Office head".to_string(),
                parent: Some(UnitCode::new("operations_division")),
            },
            OrgUnit {
                code: UnitCode::new("summit_po"),
                title: "the Summit Provincial Office head".to_string(),
                parent: Some(UnitCode::new("operations_division")),
            },
            OrgUnit {
                code: UnitCode::new("bayfield_center"),
                title: "the Bayfield Community Service Center head".to_string(),
                parent: Some(UnitCode::new("harbor_po")),
            },
            OrgUnit {
                code: UnitCode::new("lakeside_center"),
                title: "the Lakeside Community Service Center head".to_string(),
                parent: Some(UnitCode::new("harbor_po")),
            },
            OrgUnit {
                code: UnitCode::new("hillcrest_center"),
                title: "the Hillcrest Community Service Center head".to_string(),
                parent: Some(UnitCode::new("summit_po")),
            },
        ];

        Self::new(units, "the Regional Director").expect("built-in taxonomy is well formed")
    }

    pub fn unit(&self, code: &UnitCode) -> Option<&OrgUnit> {
        self.units.get(&normalize_key(&code.0))
    }

    pub fn contains(&self, code: &UnitCode) -> bool {
        self.unit(code).is_some()
    }

    pub fn title_for(&self, code: &UnitCode) -> Option<&str> {
        self.unit(code).map(|unit| unit.title.as_str())
    }

    pub fn top_authority_title(&self) -> &str {
        &self.top_authority_title
    }

    /// Ordered reporting line starting at the unit itself and ending at the
    /// last unit below the top-level authority. The top authority is never
    /// part of the line. Guarded against cycles even though construction
    /// already rejects them.
    pub fn reporting_line(&self, code: &UnitCode) -> Result<Vec<UnitCode>, TaxonomyError> {
        let mut current = self
            .units
            .get(&normalize_key(&code.0))
            .ok_or_else(|| TaxonomyError::UnknownUnit(code.0.clone()))?;

        let mut line = Vec::new();
        let mut visited = HashSet::new();
        loop {
            if !visited.insert(normalize_key(&current.code.0)) {
                return Err(TaxonomyError::Cycle(current.code.0.clone()));
            }
            line.push(current.code.clone());

            match &current.parent {
                Some(parent) => {
                    current = self.units.get(&normalize_key(&parent.0)).ok_or_else(|| {
                        TaxonomyError::MissingParent {
                            unit: current.code.0.clone(),
                            parent: parent.0.clone(),
                        }
                    })?;
                }
                None => break,
            }
        }

        Ok(line)
    }
}

pub(crate) fn normalize_key(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

#[derive(Debug, Deserialize)]
struct TaxonomyFile {
    top_authority: String,
    #[serde(default, rename = "unit")]
    units: Vec<UnitEntry>,
}

#[derive(Debug, Deserialize)]
struct UnitEntry {
    code: String,
    title: String,
    parent: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{OrgTaxonomy, OrgUnit, TaxonomyError, UnitCode};

    fn unit(code: &str, parent: Option<&str>) -> OrgUnit {
        OrgUnit {
            code: UnitCode::new(code),
            title: format!("the {code} head"),
            parent: parent.map(UnitCode::new),
        }
    }

    #[test]
    fn reporting_line_starts_at_the_unit_and_walks_upward() {
        let taxonomy = OrgTaxonomy::default_region();
        let line = taxonomy
            .reporting_line(&UnitCode::new("bayfield_center"))
            .expect("known unit resolves");

        let codes: Vec<&str> = line.iter().map(|code| code.0.as_str()).collect();
        assert_eq!(
            codes,
            vec!["bayfield_center", "harbor_po", "operations_division", "finance_admin_division"],
        );
    }

    #[test]
    fn reporting_line_terminates_for_every_unit() {
        let taxonomy = OrgTaxonomy::default_region();
        for code in ["bayfield_center", "lakeside_center", "hillcrest_center", "harbor_po", "summit_po", "operations_division", "finance_admin_division"]
        {
            let line =
                taxonomy.reporting_line(&UnitCode::new(code)).expect("every unit has a line");
            assert!(!line.is_empty());
            assert_eq!(line[0], UnitCode::new(code));
        }
    }

    #[test]
    fn unknown_unit_is_reported() {
        let taxonomy = OrgTaxonomy::default_region();
        let error = taxonomy
            .reporting_line(&UnitCode::new("atlantis_center"))
            .expect_err("unknown unit must fail");
        assert_eq!(error, TaxonomyError::UnknownUnit("atlantis_center".to_string()));
    }

    #[test]
    fn cycles_are_rejected_at_construction() {
        let error = OrgTaxonomy::new(
            vec![unit("a", Some("b")), unit("b", Some("a"))],
            "the Regional Director",
        )
        .expect_err("cycle must be rejected");
        assert!(matches!(error, TaxonomyError::Cycle(_)));
    }

    #[test]
    fn missing_parents_are_rejected_at_construction() {
        let error = OrgTaxonomy::new(vec![unit("a", Some("ghost"))], "the Regional Director")
            .expect_err("dangling parent must be rejected");
        assert_eq!(
            error,
            TaxonomyError::MissingParent { unit: "a".to_string(), parent: "ghost".to_string() },
        );
    }

    #[test]
    fn duplicate_codes_are_rejected() {
        let error = OrgTaxonomy::new(
            vec![unit("a", None), unit("A", None)],
            "the Regional Director",
        )
        .expect_err("codes are case-insensitive");
        assert!(matches!(error, TaxonomyError::DuplicateUnit(_)));
    }

    #[test]
    fn loads_from_toml() {
        let taxonomy = OrgTaxonomy::from_toml_str(
            r#"
top_authority = "the Regional Director"

[[unit]]
code = "division"
title = "the Division chief"

[[unit]]
code = "office"
title = "the Office head"
parent = "division"
"#,
        )
        .expect("well-formed taxonomy loads");

        assert_eq!(taxonomy.top_authority_title(), "the Regional Director");
        assert_eq!(taxonomy.title_for(&UnitCode::new("office")), Some("the Office head"));
        let line = taxonomy.reporting_line(&UnitCode::new("office")).expect("line resolves");
        assert_eq!(line, vec![UnitCode::new("office"), UnitCode::new("division")]);
    }

    #[test]
    fn lookups_normalize_case_and_whitespace() {
        let taxonomy = OrgTaxonomy::default_region();
        assert!(taxonomy.contains(&UnitCode::new(" Harbor_PO ")));
    }
}
