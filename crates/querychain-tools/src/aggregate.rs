// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use querychain_core::{QueryChainError, ToolResult};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{prompts, validate, Toolbox};

impl Toolbox {
    /// Aggregation: the model writes a read-only pipeline, which is run verbatim.
    pub async fn aggregation(&self, collection: &str, query: &str) -> ToolResult {
        match self.try_aggregation(collection, query).await {
            Ok(result) => result,
            Err(e) => {
                warn!(collection, error = %e, "aggregation failed");
                ToolResult::failure(&e)
            }
        }
    }

    async fn try_aggregation(
        &self,
        collection: &str,
        query: &str,
    ) -> Result<ToolResult, QueryChainError> {
        let prompt = prompts::aggregation_prompt(&self.settings.hints, query);
        let pipeline: Value = self.bridge.call_json(&prompt).await?;
        let stages = validate::validate_pipeline(&pipeline)?;
        debug!(collection, stages = stages.len(), "running model pipeline");

        let docs = self
            .with_deadline(self.store.aggregate(collection, &stages))
            .await?;
        Ok(ToolResult {
            pipeline: Some(Value::Array(stages)),
            ..ToolResult::with_documents(docs)
        })
    }
}
