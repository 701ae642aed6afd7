/// Fixed names and literals shared across the pipeline
/// These mirror the vocabulary of the eJP bulk export and must not vary per deployment

// Archive layout
pub const MANIFEST_FILENAME: &str = "go.xml";
pub const MANIFEST_CREATE_DATE_ATTRIBUTE: &str = "create_date";
pub const MANIFEST_FILENAME_ELEMENT: &str = "file_nm";

// Root tags of the two document families
pub const MANUSCRIPT_ROOT_TAG: &str = "xml";
pub const PERSON_ROOT_TAG: &str = "persons";

// Dates written by eJP are local to this zone unless they carry an offset
pub const DEFAULT_REFERENCE_TIMEZONE: &str = "US/Eastern";

pub const INITIAL_SUBMISSION_TYPE_PREFIX: &str = "Initial Submission:";
pub const GENERATED_PERSON_ID_PREFIX: &str = "generated-";

// Person-family subject lists share one container element, told apart by its `name`
pub const RESEARCH_ORGANISM_LIST_NAME: &str = "Research Organism(s)";
pub const SUBJECT_AREA_LIST_NAME: &str = "Major Subject Area(s)";

/// Number of raw person nodes quoted in the missing-id summary
pub const MISSING_PERSON_ID_EXAMPLE_COUNT: usize = 3;

// Environment
pub const CONFIG_FILE_PATH_ENV: &str = "EJP_XML_CONFIG_FILE_PATH";
pub const DEPLOYMENT_ENV_ENV: &str = "DEPLOYMENT_ENV";
pub const ENVIRONMENT_PLACEHOLDER: &str = "{ENV}";
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
