//! Mapping resources bundled into the binary.
//!
//! One resource per schema family, kept in the workspace `mappings/`
//! directory so they can be edited and diffed as plain JSON.

/// Schema families with a bundled resource, in ascending order.
pub static EMBEDDED_FAMILIES: [&str; 12] = [
    "2009",
    "2010",
    "2011",
    "2012",
    "2013",
    "2014",
    "2015",
    "2016",
    "2017",
    "2018",
    "2019",
    "2020",
];

/// Bundled resource text per family.
pub(super) static EMBEDDED_RESOURCES: [(&str, &str); 12] = [
    ("2009", include_str!("../../../../mappings/2009.json")),
    ("2010", include_str!("../../../../mappings/2010.json")),
    ("2011", include_str!("../../../../mappings/2011.json")),
    ("2012", include_str!("../../../../mappings/2012.json")),
    ("2013", include_str!("../../../../mappings/2013.json")),
    ("2014", include_str!("../../../../mappings/2014.json")),
    ("2015", include_str!("../../../../mappings/2015.json")),
    ("2016", include_str!("../../../../mappings/2016.json")),
    ("2017", include_str!("../../../../mappings/2017.json")),
    ("2018", include_str!("../../../../mappings/2018.json")),
    ("2019", include_str!("../../../../mappings/2019.json")),
    ("2020", include_str!("../../../../mappings/2020.json")),
];

/// Look up the bundled resource for a family.
pub(super) fn resource(family: &str) -> Option<&'static str> {
    EMBEDDED_RESOURCES
        .iter()
        .find(|(name, _)| *name == family)
        .map(|(_, text)| *text)
}
