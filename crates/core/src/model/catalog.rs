use std::fmt;
use std::ops::RangeInclusive;

use crate::model::ids::TopicId;

/// Grade band the built-in catalog covers.
pub const GRADES: RangeInclusive<u8> = 7..=9;

//
// ─── SUBJECT ───────────────────────────────────────────────────────────────────
//

/// The three subjects taught by the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subject {
    IntegratedScience,
    Mathematics,
    PreTechnical,
}

impl Subject {
    pub const ALL: [Subject; 3] = [
        Subject::IntegratedScience,
        Subject::Mathematics,
        Subject::PreTechnical,
    ];

    /// Stable slug used in routes and persisted references.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Subject::IntegratedScience => "integrated-science",
            Subject::Mathematics => "mathematics",
            Subject::PreTechnical => "pre-technical",
        }
    }

    /// Human-readable subject name.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Subject::IntegratedScience => "Integrated Science",
            Subject::Mathematics => "Mathematics",
            Subject::PreTechnical => "Pre-technical Studies",
        }
    }

    /// Looks a subject up by its slug.
    #[must_use]
    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "integrated-science" => Some(Subject::IntegratedScience),
            "mathematics" => Some(Subject::Mathematics),
            "pre-technical" => Some(Subject::PreTechnical),
            _ => None,
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

/// One entry in the built-in topic catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogTopic {
    slug: &'static str,
    title: &'static str,
}

impl CatalogTopic {
    const fn new(slug: &'static str, title: &'static str) -> Self {
        Self { slug, title }
    }

    #[must_use]
    pub fn slug(&self) -> &'static str {
        self.slug
    }

    #[must_use]
    pub fn title(&self) -> &'static str {
        self.title
    }

    /// The id under which progress for this topic is recorded.
    #[must_use]
    pub fn topic_id(&self) -> TopicId {
        TopicId::new(self.slug)
    }
}

const SCIENCE_G7: &[CatalogTopic] = &[
    CatalogTopic::new("cells", "Cells and Living Things"),
    CatalogTopic::new("matter", "States of Matter"),
    CatalogTopic::new("energy", "Energy and Forces"),
];

const SCIENCE_G8: &[CatalogTopic] = &[
    CatalogTopic::new("genetics", "Genetics and Inheritance"),
    CatalogTopic::new("reactions", "Chemical Reactions"),
    CatalogTopic::new("electricity", "Electricity and Magnetism"),
];

const SCIENCE_G9: &[CatalogTopic] = &[
    CatalogTopic::new("ecosystems", "Ecosystems and Environment"),
    CatalogTopic::new("atomic", "Atomic Structure"),
    CatalogTopic::new("waves", "Waves and Sound"),
];

const MATH_G7: &[CatalogTopic] = &[
    CatalogTopic::new("algebra", "Introduction to Algebra"),
    CatalogTopic::new("geometry", "Basic Geometry"),
    CatalogTopic::new("numbers", "Number Systems"),
];

const MATH_G8: &[CatalogTopic] = &[
    CatalogTopic::new("equations", "Linear Equations"),
    CatalogTopic::new("triangles", "Triangles and Pythagoras"),
    CatalogTopic::new("statistics", "Statistics and Probability"),
];

const MATH_G9: &[CatalogTopic] = &[
    CatalogTopic::new("quadratic", "Quadratic Equations"),
    CatalogTopic::new("trigonometry", "Introduction to Trigonometry"),
    CatalogTopic::new("graphs", "Graphs and Functions"),
];

const PRETECH_G7: &[CatalogTopic] = &[
    CatalogTopic::new("tools", "Basic Tools and Safety"),
    CatalogTopic::new("materials", "Materials and Properties"),
    CatalogTopic::new("drawing", "Technical Drawing"),
];

const PRETECH_G8: &[CatalogTopic] = &[
    CatalogTopic::new("electronics", "Basic Electronics"),
    CatalogTopic::new("mechanics", "Simple Machines"),
    CatalogTopic::new("construction", "Construction Techniques"),
];

const PRETECH_G9: &[CatalogTopic] = &[
    CatalogTopic::new("circuits", "Electronic Circuits"),
    CatalogTopic::new("engineering", "Engineering Principles"),
    CatalogTopic::new("design", "Design and Innovation"),
];

/// Topics offered for a subject at a grade level.
///
/// Grades outside the supported band simply have no topics.
#[must_use]
pub fn topics_for(subject: Subject, grade: u8) -> &'static [CatalogTopic] {
    match (subject, grade) {
        (Subject::IntegratedScience, 7) => SCIENCE_G7,
        (Subject::IntegratedScience, 8) => SCIENCE_G8,
        (Subject::IntegratedScience, 9) => SCIENCE_G9,
        (Subject::Mathematics, 7) => MATH_G7,
        (Subject::Mathematics, 8) => MATH_G8,
        (Subject::Mathematics, 9) => MATH_G9,
        (Subject::PreTechnical, 7) => PRETECH_G7,
        (Subject::PreTechnical, 8) => PRETECH_G8,
        (Subject::PreTechnical, 9) => PRETECH_G9,
        _ => &[],
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
