//! Return type references (`Name`, `Name!`, `[Name]`, `[Name!]!`).

/// Identified return type of a resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReturnType {
    /// Named type, without list brackets or non-null markers.
    pub name: String,
    /// Whether the reference is a list.
    pub array: bool,
}

/// Parse a type reference. Non-null markers are ignored.
///
/// Missing or empty input yields an empty name and `array == false`.
pub fn parse_return_type(return_type: Option<&str>) -> ReturnType {
    let Some(text) = return_type.filter(|text| !text.is_empty()) else {
        return ReturnType::default();
    };

    let (array, inner) = match text.strip_prefix('[') {
        Some(inner) => (true, inner),
        None => (false, text),
    };
    let name = inner
        .chars()
        .take_while(|c| *c != '!' && *c != ']')
        .collect();

    ReturnType { name, array }
}
