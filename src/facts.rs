//! Fact aggregation.
//!
//! Collects the extractor outputs into one [`DailyFacts`]. Every fact is
//! required: a page without its animal, weather or musician is not worth
//! publishing, so the first missing one fails the run.

use crate::error::ExtractionError;
use crate::models::{Animal, DailyFacts, Musician};
use chrono::{DateTime, FixedOffset};
use tracing::{error, info};

pub fn aggregate(
    animal: Result<Animal, ExtractionError>,
    weather: Result<String, ExtractionError>,
    musician: Result<Musician, ExtractionError>,
    now: DateTime<FixedOffset>,
) -> Result<DailyFacts, ExtractionError> {
    let mut failures = Vec::new();
    let animal = animal.map_err(|e| failures.push(e)).ok();
    let weather = weather.map_err(|e| failures.push(e)).ok();
    let musician = musician.map_err(|e| failures.push(e)).ok();

    match (animal, weather, musician) {
        (Some(animal), Some(weather), Some(musician)) => {
            let facts = DailyFacts {
                date: now.date_naive(),
                generated_at: now,
                weather,
                animal,
                musician,
            };
            info!(
                date = %facts.date,
                animal = %facts.animal.name,
                musician = %facts.musician.name,
                "Aggregated daily facts"
            );
            Ok(facts)
        }
        _ => {
            for failure in &failures {
                error!(error = %failure, "Extractor failed");
            }
            Err(failures.remove(0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-03-10T06:00:00+01:00").unwrap()
    }

    fn animal() -> Animal {
        Animal {
            name: "Aardvark".to_string(),
            image_url: "https://x/a.jpg".to_string(),
        }
    }

    fn musician() -> Musician {
        Musician {
            name: "Ada Example".to_string(),
            biography_url: Some("https://x/ada".to_string()),
            summary: "A singer.".to_string(),
        }
    }

    #[test]
    fn test_aggregate_all_present() {
        let facts = aggregate(
            Ok(animal()),
            Ok("High 60°F, low 40°F".to_string()),
            Ok(musician()),
            now(),
        )
        .unwrap();
        assert_eq!(facts.date, NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        assert_eq!(facts.generated_at, now());
        assert_eq!(facts.animal, animal());
        assert_eq!(facts.musician, musician());
    }

    #[test]
    fn test_date_follows_local_offset() {
        // 2024-03-10 00:30 at +01:00 is still 2024-03-09 in UTC.
        let now = DateTime::parse_from_rfc3339("2024-03-10T00:30:00+01:00").unwrap();
        let facts = aggregate(Ok(animal()), Ok(String::new()), Ok(musician()), now).unwrap();
        assert_eq!(facts.date, NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
    }

    #[test]
    fn test_missing_fact_is_fatal() {
        let err = aggregate(
            Ok(animal()),
            Err(ExtractionError::Empty("weather")),
            Ok(musician()),
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, ExtractionError::Empty("weather")));
    }

    #[test]
    fn test_first_failure_is_reported() {
        let err = aggregate(
            Err(ExtractionError::Shape("animal", "no srcset".to_string())),
            Err(ExtractionError::Empty("weather")),
            Ok(musician()),
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, ExtractionError::Shape("animal", _)));
    }
}
