//! Routes of the mock object service.
//!
//! ## Structure
//! - **Project API**
//!   - `GET    /project/{project_id}/object-list/{*prefix}` list objects under a prefix
//!   - `GET    /project/{project_id}/object/{*path}` object metadata (`object/` for the root)
//!   - `DELETE /project/{project_id}/object/{*path}` delete, `?recursive=` for directories
//!   - `POST   /project/{project_id}/presign/upload` start a multipart upload
//!   - `POST   /project/{project_id}/presign/upload/part` presign one part
//!   - `PUT    /project/{project_id}/presign/upload/complete` complete the upload
//!   - `POST   /project/{project_id}/presign/download` presign a download
//!
//! - **Presigned targets**
//!   - `PUT    /presigned/part/{upload_id}/{part_number}`
//!   - `GET    /presigned/object/{token}`

use super::{
    MockState,
    handlers::{
        complete_upload, delete_object, get_object, get_presigned_object, get_root_object,
        list_objects, list_root, presign_download, presign_upload, presign_upload_part, put_part,
    },
};
use axum::{
    Router,
    routing::{get, post, put},
};

pub fn routes() -> Router<MockState> {
    Router::new()
        .route("/project/{project_id}/object-list/", get(list_root))
        .route("/project/{project_id}/object-list/{*prefix}", get(list_objects))
        .route("/project/{project_id}/object/", get(get_root_object))
        .route(
            "/project/{project_id}/object/{*path}",
            get(get_object).delete(delete_object),
        )
        .route("/project/{project_id}/presign/upload", post(presign_upload))
        .route(
            "/project/{project_id}/presign/upload/part",
            post(presign_upload_part),
        )
        .route(
            "/project/{project_id}/presign/upload/complete",
            put(complete_upload),
        )
        .route("/project/{project_id}/presign/download", post(presign_download))
        .route("/presigned/part/{upload_id}/{part_number}", put(put_part))
        .route("/presigned/object/{token}", get(get_presigned_object))
}
