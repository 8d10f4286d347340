use prox_core::entities::EntityRef;
use serde::de::DeserializeOwned;

use crate::cli::root_commands::OriginArgs;

/// Parse a snake_case enum value using serde-deserialization.
pub fn parse_enum<T>(raw: &str, field: &str) -> anyhow::Result<T>
where
    T: DeserializeOwned,
{
    let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
    let json = format!("\"{normalized}\"");
    serde_json::from_str(&json).map_err(|error| anyhow::anyhow!("invalid {field} '{raw}': {error}"))
}

/// Parse an optional enum flag.
pub fn parse_opt_enum<T>(raw: Option<&str>, field: &str) -> anyhow::Result<Option<T>>
where
    T: DeserializeOwned,
{
    raw.map(|value| parse_enum(value, field)).transpose()
}

/// Resolve `--origin-id/--origin-type` into an entity reference.
pub fn origin(args: &OriginArgs) -> anyhow::Result<EntityRef> {
    Ok(EntityRef::new(
        args.origin_id,
        parse_enum(&args.origin_type, "origin type")?,
    ))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use prox_core::enums::{EntityType, ProviderId, ReviewStatus};

    use super::{parse_enum, parse_opt_enum};

    #[test]
    fn parses_snake_case_enum() {
        let ty: EntityType = parse_enum("camp_spot", "origin type").expect("type should parse");
        assert_eq!(ty, EntityType::CampSpot);
    }

    #[test]
    fn parses_hyphenated_and_uppercase_aliases() {
        let ty: EntityType = parse_enum("Camp-Spot", "origin type").expect("type should parse");
        assert_eq!(ty, EntityType::CampSpot);
        let provider: ProviderId = parse_enum("NOMINATIM", "provider").expect("should parse");
        assert_eq!(provider, ProviderId::Nominatim);
    }

    #[test]
    fn errors_on_invalid_enum() {
        let err = parse_enum::<ReviewStatus>("done", "status").expect_err("should fail");
        assert!(err.to_string().contains("invalid status 'done'"));
    }

    #[test]
    fn optional_enum_passes_none_through() {
        let parsed: Option<EntityType> = parse_opt_enum(None, "target type").unwrap();
        assert!(parsed.is_none());
    }
}
