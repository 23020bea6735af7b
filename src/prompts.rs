//! Prompt composition.
//!
//! Pure rendering of [`DailyFacts`] into generation requests. Nothing here does
//! I/O; the page contract (element ids, sentinels, archive paths, fenced
//! output) is spelled out so the splicer can find what it needs afterwards.

use crate::models::{
    DailyFacts, GenerationRequest, ModelParameters, MusicianDraft, Placeholder,
};
use chrono::{Duration, NaiveDate, SecondsFormat};

/// Relative path of the archive entry for `date`.
pub fn archive_link(date: NaiveDate) -> String {
    format!("archive/{}.html", date.format("%Y-%m-%d"))
}

/// Links to the previous and next day's archive entries.
pub fn navigation_links(date: NaiveDate) -> (String, String) {
    (
        archive_link(date - Duration::days(1)),
        archive_link(date + Duration::days(1)),
    )
}

/// Render the request for today's page.
pub fn compose_page_request(facts: &DailyFacts, parameters: ModelParameters) -> GenerationRequest {
    GenerationRequest {
        prompt_text: page_prompt(facts),
        parameters,
    }
}

/// Render the request that condenses a biography for the page.
pub fn compose_summary_request(
    draft: &MusicianDraft,
    parameters: ModelParameters,
) -> GenerationRequest {
    GenerationRequest {
        prompt_text: summary_prompt(draft),
        parameters,
    }
}

fn page_prompt(facts: &DailyFacts) -> String {
    let iso = facts.generated_at.to_rfc3339_opts(SecondsFormat::Millis, true);
    let (previous, next) = navigation_links(facts.date);
    let musician = &facts.musician.name;
    let image_id = Placeholder::MusicianImage.element_id();
    let image_sentinel = Placeholder::MusicianImage.sentinel().unwrap_or_default();
    let text_id = Placeholder::MusicianText.element_id();
    let spotify_id = Placeholder::SpotifyLink.element_id();
    let spotify_sentinel = Placeholder::SpotifyLink.sentinel().unwrap_or_default();
    let wiki_id = Placeholder::BiographyLink.element_id();
    let wiki_sentinel = Placeholder::BiographyLink.sentinel().unwrap_or_default();

    format!(
        r#"Give me a "fun facts of the day" html only page that would be fun and useful to elementary students. Javascript is not allowed: do not include any script tags or event handler attributes.
Style the page in a way that is visually appealing to elementary students using an inline style tag. Include 40px of padding for the html element.
The title of the page should include the current date in a humanized format, along with the day of the week. The current date and time in ISO format is: {iso}.
After the title, include the weather for the area. The current weather is: {weather}
After the weather, include an animal of the day, which is the {animal}. The animal should be accompanied with facts like its habitat, diet, and other interesting information. Include an img tag of the animal with the src of {animal_img}.
After the animal, the page should contain a color of the day that has a name to it, along with the hex code. Ensure that the color of the day is visually represented by using the color as a background, and choose white or black text, whichever is better for readability.
Also include information about the music artist {musician}: their birth year, musical genres, birthplace, and other interesting information.
For the music artist, include an img tag 400px by 400px horizontally centered with the id attribute "{image_id}", the src attribute "{image_sentinel}", and the alt attribute of the name of the artist.
Below the image, include an empty div with the id attribute "{text_id}". A short biography will be placed inside it.
Also include the links <a href="{spotify_sentinel}" id="{spotify_id}">Listen to {musician} on Spotify 🎶</a> and <a href="{wiki_sentinel}" id="{wiki_id}">Read more about {musician}</a>.
Also include a word of the day that is a good spelling word for 2nd graders. Make the word of the day large. Next, include a dictionary definition of the word. Next, include a sentence appropriate for a 2nd grader, displayed on its own, that uses the word of the day.
At the end of the page, include a link to the previous day's page at the relative path "{previous}" and a link to the next day's page at the relative path "{next}".
Return the complete html document inside a markdown code block that starts with ```html and ends with ```."#,
        weather = facts.weather,
        animal = facts.animal.name,
        animal_img = facts.animal.image_url,
    )
}

fn summary_prompt(draft: &MusicianDraft) -> String {
    format!(
        "Summarize the following biography of the musician {name} in three or four short sentences that an elementary student can read. \
Mention what kind of music they made and one fun fact. Reply with plain text only, no markdown and no html.\n\nBIOGRAPHY:\n<{text}>",
        name = draft.name,
        text = draft.biography_text,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Animal, Musician};
    use chrono::DateTime;

    fn facts() -> DailyFacts {
        let generated_at = DateTime::parse_from_rfc3339("2024-03-10T14:30:00-05:00").unwrap();
        DailyFacts {
            date: generated_at.date_naive(),
            generated_at,
            weather: "High 60°F, low 40°F".to_string(),
            animal: Animal {
                name: "Aardvark".to_string(),
                image_url: "https://x/a.jpg".to_string(),
            },
            musician: Musician {
                name: "Ada Example".to_string(),
                biography_url: None,
                summary: "...".to_string(),
            },
        }
    }

    fn params() -> ModelParameters {
        ModelParameters {
            model: "m".to_string(),
            temperature: 0.7,
            max_tokens: 1000,
        }
    }

    #[test]
    fn test_archive_links() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(
            navigation_links(date),
            (
                "archive/2024-02-29.html".to_string(),
                "archive/2024-03-02.html".to_string()
            )
        );
    }

    #[test]
    fn test_iso_timestamp_appears_exactly_once() {
        let request = compose_page_request(&facts(), params());
        let iso = "2024-03-10T14:30:00.000-05:00";
        assert_eq!(request.prompt_text.matches(iso).count(), 1);
    }

    #[test]
    fn test_prompt_contains_archive_links() {
        let prompt = compose_page_request(&facts(), params()).prompt_text;
        assert!(prompt.contains("archive/2024-03-09.html"));
        assert!(prompt.contains("archive/2024-03-11.html"));
    }

    #[test]
    fn test_prompt_declares_placeholders() {
        let prompt = compose_page_request(&facts(), params()).prompt_text;
        assert!(prompt.contains(r#"id attribute "musician-img""#));
        assert!(prompt.contains("MUSICIAN-IMG-REPLACE"));
        assert!(prompt.contains(r#"id attribute "musician""#));
        assert!(prompt.contains(r#"id="link-spotify""#));
        assert!(prompt.contains(r#"id="link-wikipedia""#));
    }

    #[test]
    fn test_prompt_contract() {
        let prompt = compose_page_request(&facts(), params()).prompt_text;
        assert!(prompt.contains("Javascript is not allowed"));
        assert!(prompt.contains("```html"));
        assert!(prompt.contains("High 60°F, low 40°F"));
        assert!(prompt.contains("Aardvark"));
        assert!(prompt.contains("src of https://x/a.jpg"));
        assert!(prompt.contains("Ada Example"));
        assert!(prompt.contains("color of the day"));
        assert!(prompt.contains("word of the day"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        assert_eq!(
            compose_page_request(&facts(), params()),
            compose_page_request(&facts(), params())
        );
    }

    #[test]
    fn test_summary_prompt() {
        let draft = MusicianDraft {
            name: "Ada Example".to_string(),
            biography_url: Some("https://x/ada".to_string()),
            biography_text: "Ada Example is a singer.".to_string(),
        };
        let request = compose_summary_request(&draft, params());
        assert!(request.prompt_text.contains("Ada Example is a singer."));
        assert!(request.prompt_text.contains("musician Ada Example"));
        assert_eq!(request.parameters.max_tokens, 1000);
    }
}
