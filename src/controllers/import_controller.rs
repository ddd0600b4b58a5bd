use std::sync::Arc;

use crate::dto::import_dto::{decode, ImportFormat};
use crate::dto::ApiResponse;
use crate::models::import::ImportReport;
use crate::services::ImportService;
use crate::utils::errors::AppResult;

pub struct ImportController {
    importer: Arc<ImportService>,
}

impl ImportController {
    pub fn new(importer: Arc<ImportService>) -> Self {
        Self { importer }
    }

    pub async fn import(&self, format: Option<&str>, body: &str) -> AppResult<ApiResponse<ImportReport>> {
        let format = format.map(str::parse::<ImportFormat>).transpose()?;
        let batch = decode(format, body)?;

        let report = self.importer.import(batch).await?;
        let message = match report.warnings.len() {
            0 => "Importación completada".to_string(),
            n => format!("Importación completada con {} avisos", n),
        };
        Ok(ApiResponse::success_with_message(report, message))
    }
}
