use serde::{Serialize, Serializer};

/// A single job posting scraped from its detail page.
///
/// Field order matches the CSV header, see [`Job::FIELDS`].
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Job {
    title: String,
    #[serde(serialize_with = "technologies_as_json")]
    technologies: Option<Vec<String>>,
    experience_years: u32,
    salary: Option<u32>,
    views: u32,
    applications: u32,
}

impl Job {
    pub const FIELDS: [&'static str; 6] = [
        "title",
        "technologies",
        "experience_years",
        "salary",
        "views",
        "applications",
    ];

    pub fn new(
        title: String,
        technologies: Option<Vec<String>>,
        experience_years: u32,
        salary: Option<u32>,
        views: u32,
        applications: u32,
    ) -> Self {
        Self {
            title,
            technologies,
            experience_years,
            salary,
            views,
            applications,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// `None` when the posting lists no technology tags.
    pub fn technologies(&self) -> Option<&[String]> {
        self.technologies.as_deref()
    }

    pub fn experience_years(&self) -> u32 {
        self.experience_years
    }

    pub fn salary(&self) -> Option<u32> {
        self.salary
    }

    pub fn views(&self) -> u32 {
        self.views
    }

    pub fn applications(&self) -> u32 {
        self.applications
    }
}

/// Tabular writers can't hold a nested sequence, so the tags go into a single
/// cell as a JSON array. Missing tags stay an empty cell.
fn technologies_as_json<S>(technologies: &Option<Vec<String>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match technologies {
        Some(tags) => {
            let encoded = serde_json::to_string(tags).map_err(serde::ser::Error::custom)?;
            serializer.serialize_some(&encoded)
        }
        None => serializer.serialize_none(),
    }
}
