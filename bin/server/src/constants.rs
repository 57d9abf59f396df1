/// Default server host
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port
pub const DEFAULT_PORT: u16 = 8080;

/// Default directory for permanently stored uploads
pub const DEFAULT_DATA_DIR: &str = "uploads";

/// Name of the scratch directory created under the system temp dir
pub const DEFAULT_TEMP_DIR_NAME: &str = "edu-uploads";

/// Storage category for documents
pub const DOCUMENTS_CATEGORY: &str = "documents";

/// Storage category for registration images
pub const REGISTRATIONS_CATEGORY: &str = "registrations";
