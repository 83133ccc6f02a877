//! DTOs for photo session download endpoints

use serde::Deserialize;
use utoipa::IntoParams;

/// Path parameters of the download route
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Path)]
pub struct PhotosessionPath {
    /// Owner of the photo session
    #[param(example = "u1")]
    pub user_id: String,
    /// Folder to archive; also names the downloaded file
    #[param(example = "f1")]
    pub folder_id: String,
}
