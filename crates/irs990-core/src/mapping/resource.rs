//! On-disk mapping resource schema and validation.

use indexmap::IndexMap;
use serde::Deserialize;

use super::{CommonPaths, FieldSpec, FormMapping, MappingTable, COMMON_COLUMNS};
use crate::error::MappingError;

/// A path spec as written: one path string (empty for "absent") or an
/// ordered list of fallbacks.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSpec {
    One(String),
    Many(Vec<String>),
}

impl RawSpec {
    fn compile(&self) -> Result<FieldSpec, MappingError> {
        match self {
            RawSpec::One(path) if path.trim().is_empty() => Ok(FieldSpec::default()),
            RawSpec::One(path) => FieldSpec::parse([path]),
            RawSpec::Many(paths) => FieldSpec::parse(paths),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCommon {
    #[serde(rename = "EIN")]
    ein: RawSpec,
    #[serde(rename = "Name")]
    name: RawSpec,
    #[serde(rename = "ReturnType")]
    return_type: RawSpec,
    #[serde(rename = "TaxYear")]
    tax_year: RawSpec,
    #[serde(rename = "TaxPeriodStartDate")]
    tax_period_start: RawSpec,
    #[serde(rename = "TaxPeriodEndDate")]
    tax_period_end: RawSpec,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawForm {
    #[serde(rename = "BasePath")]
    base_path: RawSpec,
    #[serde(rename = "Fields")]
    fields: IndexMap<String, RawSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawResource {
    #[serde(rename = "Common")]
    common: RawCommon,
    #[serde(rename = "Forms", default)]
    forms: IndexMap<String, RawForm>,
}

/// Decode and validate one family's resource.
pub(super) fn build_table(
    family: &str,
    text: &str,
    required_forms: &[String],
) -> Result<MappingTable, MappingError> {
    let raw: RawResource = serde_json::from_str(text).map_err(|source| MappingError::Json {
        family: family.to_string(),
        source,
    })?;

    let invalid = |reason: String| MappingError::Invalid {
        family: family.to_string(),
        reason,
    };

    for form in required_forms {
        if !raw.forms.contains_key(form) {
            return Err(invalid(format!("missing section for form '{form}'")));
        }
    }

    let common = CommonPaths {
        ein: raw.common.ein.compile()?,
        name: raw.common.name.compile()?,
        return_type: raw.common.return_type.compile()?,
        tax_year: raw.common.tax_year.compile()?,
        tax_period_start: raw.common.tax_period_start.compile()?,
        tax_period_end: raw.common.tax_period_end.compile()?,
    };

    let mut forms = IndexMap::with_capacity(raw.forms.len());
    for (form, raw_form) in &raw.forms {
        let base_path = raw_form.base_path.compile()?;
        if base_path.is_empty() {
            return Err(invalid(format!("form '{form}' has an empty base path")));
        }

        let mut fields = Vec::with_capacity(raw_form.fields.len());
        for (name, spec) in &raw_form.fields {
            if name.trim().is_empty() {
                return Err(invalid(format!("form '{form}' declares an unnamed field")));
            }
            if COMMON_COLUMNS.contains(&name.as_str()) {
                return Err(invalid(format!(
                    "form '{form}' field '{name}' collides with a common field"
                )));
            }
            fields.push((name.clone(), spec.compile()?));
        }

        forms.insert(form.clone(), FormMapping { base_path, fields });
    }

    Ok(MappingTable {
        family: family.to_string(),
        common,
        forms,
    })
}
