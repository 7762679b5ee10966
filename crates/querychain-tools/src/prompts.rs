// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt templates for the model-backed tools.

use std::collections::BTreeMap;
use std::fmt::Write;

/// What the prompts need to know about the documents being queried.
#[derive(Debug, Clone)]
pub struct SchemaHints {
    pub fields: Vec<String>,
    pub code_table: BTreeMap<String, String>,
    /// Fields holding numbers, compared with range operators.
    pub numeric_fields: Vec<String>,
}

impl SchemaHints {
    fn render(&self, out: &mut String) {
        let _ = writeln!(out, "Documents have the fields: {}.", self.fields.join(", "));
        if !self.numeric_fields.is_empty() {
            let _ = writeln!(
                out,
                "Numeric fields ({}) are stored as numbers, never strings.",
                self.numeric_fields.join(", ")
            );
        }
        if !self.code_table.is_empty() {
            out.push_str("Expand these short codes to their full values:\n");
            for (code, value) in &self.code_table {
                let _ = writeln!(out, "- {code} = {value}");
            }
        }
    }
}

/// Natural language to a find filter.
pub fn query_prompt(hints: &SchemaHints, request: &str) -> String {
    let mut p = String::from(
        "Translate the request into a MongoDB find filter.\n\
         Respond with a single JSON object and nothing else.\n\n",
    );
    hints.render(&mut p);
    p.push_str(
        "\nRules:\n\
         - Match text fields with a case-insensitive substring regex: {\"$regex\": \"...\", \"$options\": \"i\"}.\n\
         - Compare numeric fields with $gt, $gte, $lt, $lte or $eq.\n\
         - Allowed operators: $eq $ne $gt $gte $lt $lte $in $nin $regex $options $exists $and $or $nor.\n\
         - Use {} when the request names no condition.\n\n\
         Examples:\n\
         \"CTC greater than 50\" -> {\"CTC\": {\"$gt\": 50}}\n\
         \"Name contains John\" -> {\"Name\": {\"$regex\": \"John\", \"$options\": \"i\"}}\n\n",
    );
    let _ = write!(p, "Request: {request}\nFilter:");
    p
}

/// Natural language to a `{filter, update}` pair.
pub fn update_prompt(hints: &SchemaHints, instruction: &str) -> String {
    let mut p = String::from(
        "Translate the instruction into a MongoDB update.\n\
         Respond with exactly {\"filter\": {...}, \"update\": {\"$set\": {...}}} and nothing else.\n\n",
    );
    hints.render(&mut p);
    p.push_str(
        "\nRules:\n\
         - The filter must identify specific records. Never return a filter that matches everything.\n\
         - Match names with a case-insensitive regex.\n\
         - The update may only use $set.\n\
         - If the target records are unclear, return {\"filter\": {}, \"update\": {}}.\n\n\
         Example:\n\
         \"Change CTC for John Doe to 70\" -> \
         {\"filter\": {\"Name\": {\"$regex\": \"John Doe\", \"$options\": \"i\"}}, \"update\": {\"$set\": {\"CTC\": 70}}}\n\n",
    );
    let _ = write!(p, "Instruction: {instruction}\nUpdate:");
    p
}

/// Natural language to an aggregation pipeline.
pub fn aggregation_prompt(hints: &SchemaHints, request: &str) -> String {
    let mut p = String::from(
        "Translate the request into a MongoDB aggregation pipeline.\n\
         Respond with a single JSON array of stages and nothing else.\n\n",
    );
    hints.render(&mut p);
    p.push_str(
        "\nRules:\n\
         - Allowed stages: $match $group $sort $limit $skip $project $count $unwind $addFields.\n\
         - Never write data ($out and $merge are forbidden).\n\n\
         Examples:\n\
         \"Average CTC by branch\" -> [{\"$group\": {\"_id\": \"$Branch\", \"avgCTC\": {\"$avg\": \"$CTC\"}}}]\n\
         \"How many people per company\" -> [{\"$group\": {\"_id\": \"$Company\", \"count\": {\"$sum\": 1}}}]\n\n",
    );
    let _ = write!(p, "Request: {request}\nPipeline:");
    p
}
