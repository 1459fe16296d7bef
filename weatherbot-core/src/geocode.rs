//! Location resolution: turn raw user input into coordinates and a place
//! label via the geocoding provider.

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::{Coordinates, Place, ResolvedLocation};
use crate::provider::LocationProvider;

/// US state abbreviations and full names, used to normalize
/// `"city, ST"` / `"city, State Name"` queries before geocoding.
const US_STATES: &[(&str, &str)] = &[
    ("AL", "Alabama"),
    ("AK", "Alaska"),
    ("AZ", "Arizona"),
    ("AR", "Arkansas"),
    ("CA", "California"),
    ("CO", "Colorado"),
    ("CT", "Connecticut"),
    ("DE", "Delaware"),
    ("DC", "District of Columbia"),
    ("FL", "Florida"),
    ("GA", "Georgia"),
    ("HI", "Hawaii"),
    ("ID", "Idaho"),
    ("IL", "Illinois"),
    ("IN", "Indiana"),
    ("IA", "Iowa"),
    ("KS", "Kansas"),
    ("KY", "Kentucky"),
    ("LA", "Louisiana"),
    ("ME", "Maine"),
    ("MD", "Maryland"),
    ("MA", "Massachusetts"),
    ("MI", "Michigan"),
    ("MN", "Minnesota"),
    ("MS", "Mississippi"),
    ("MO", "Missouri"),
    ("MT", "Montana"),
    ("NE", "Nebraska"),
    ("NV", "Nevada"),
    ("NH", "New Hampshire"),
    ("NJ", "New Jersey"),
    ("NM", "New Mexico"),
    ("NY", "New York"),
    ("NC", "North Carolina"),
    ("ND", "North Dakota"),
    ("OH", "Ohio"),
    ("OK", "Oklahoma"),
    ("OR", "Oregon"),
    ("PA", "Pennsylvania"),
    ("RI", "Rhode Island"),
    ("SC", "South Carolina"),
    ("SD", "South Dakota"),
    ("TN", "Tennessee"),
    ("TX", "Texas"),
    ("UT", "Utah"),
    ("VT", "Vermont"),
    ("VA", "Virginia"),
    ("WA", "Washington"),
    ("WV", "West Virginia"),
    ("WI", "Wisconsin"),
    ("WY", "Wyoming"),
];

/// Look up a US state by two-letter code or full name (case-insensitive).
/// Returns the canonical two-letter code.
pub fn state_code(input: &str) -> Option<&'static str> {
    let trimmed = input.trim();
    US_STATES
        .iter()
        .find(|(abbr, name)| trimmed.eq_ignore_ascii_case(abbr) || trimmed.eq_ignore_ascii_case(name))
        .map(|(abbr, _)| *abbr)
}

/// The three terminal shapes a location argument can take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationQuery {
    /// No argument: use the configured default coordinates.
    Default,
    /// A 4-10 digit run: postal/zip code.
    Zip(String),
    /// Anything else: free-form place string.
    Place(String),
}

impl LocationQuery {
    /// Classify a raw argument, in fixed priority: empty, zip-like, free-form.
    pub fn classify(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            LocationQuery::Default
        } else if is_zip_like(trimmed) {
            LocationQuery::Zip(trimmed.to_string())
        } else {
            LocationQuery::Place(trimmed.to_string())
        }
    }
}

fn is_zip_like(s: &str) -> bool {
    (4..=10).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit())
}

/// Rewrite `"city, ST"` / `"city, Full State Name"` to the provider's
/// `city,st,us` form. Anything that isn't a recognized two-part US query
/// passes through untouched (e.g. `"London, UK"`).
pub fn normalize_place_query(raw: &str) -> String {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    if let [city, region] = parts[..] {
        if let Some(code) = state_code(region) {
            return format!("{},{},us", city, code.to_lowercase());
        }
    }
    raw.trim().to_string()
}

/// Resolve a classified query to coordinates and a place label.
///
/// The default-coordinates path reverse-geocodes for a label; a reverse
/// lookup failure is non-fatal and leaves the place empty.
pub async fn resolve(
    locations: &dyn LocationProvider,
    query: &LocationQuery,
    default_coordinates: Option<Coordinates>,
) -> Result<ResolvedLocation> {
    match query {
        LocationQuery::Default => {
            let coordinates = default_coordinates
                .ok_or_else(|| Error::Configuration("No default location set.".to_string()))?;
            let place = match locations.reverse(coordinates).await {
                Ok(place) => place,
                Err(err) => {
                    warn!("reverse geocode failed, continuing without a place label: {err}");
                    Place::default()
                }
            };
            Ok(ResolvedLocation { coordinates, place })
        }
        LocationQuery::Zip(zip) => locations.by_zip(zip).await,
        LocationQuery::Place(raw) => {
            let normalized = normalize_place_query(raw);
            debug!("geocoding place query {normalized:?}");
            locations.direct(&normalized).await
        }
    }
}
