use uuid::Uuid;

pub type JobId = Uuid;
pub type ExtraVars = Vec<(String, String)>;
pub type EnvOverlay = Vec<(String, String)>;
pub type OutputBlob = bytes::Bytes;
