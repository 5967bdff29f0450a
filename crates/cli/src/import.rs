//! Work item drafts read by `optrack import`.
//!
//! Drafts carry no ids or timer state; ids are generated and `order_index`
//! follows the position in the file.

use anyhow::{Context, Result};
use optrack_core::{PartNumber, Phase, Priority, Subphase, WorkItem};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ItemDraft {
    pub part_number: String,
    pub name: String,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub phases: Vec<PhaseDraft>,
}

#[derive(Debug, Deserialize)]
pub struct PhaseDraft {
    pub name: String,
    #[serde(default)]
    pub subphases: Vec<SubphaseDraft>,
}

#[derive(Debug, Deserialize)]
pub struct SubphaseDraft {
    pub name: String,
    #[serde(default)]
    pub expected_duration: Option<u32>,
    #[serde(default)]
    pub expected_quantity: u32,
}

impl ItemDraft {
    pub fn into_work_item(self) -> Result<WorkItem> {
        let part_number = PartNumber::new(&self.part_number)
            .with_context(|| format!("invalid part number for {:?}", self.name))?;

        let mut item = WorkItem::new(part_number, self.name);
        item.client_name = self.client_name;
        item.priority = self.priority;
        item.remarks = self.remarks;

        for (pi, phase_draft) in self.phases.into_iter().enumerate() {
            let mut phase = Phase::new(phase_draft.name, pi as u32);
            for (si, sub) in phase_draft.subphases.into_iter().enumerate() {
                let mut subphase = Subphase::quantity_tracked(sub.name, si as u32, sub.expected_quantity);
                subphase.expected_duration = sub.expected_duration;
                phase = phase.with_subphase(subphase);
            }
            item = item.with_phase(phase);
        }
        Ok(item)
    }
}

/// Parse a file holding either one draft or an array of drafts.
pub fn parse_drafts(json: &str) -> Result<Vec<ItemDraft>> {
    let value: serde_json::Value = serde_json::from_str(json).context("import file is not valid JSON")?;
    let drafts = if value.is_array() {
        serde_json::from_value(value)?
    } else {
        vec![serde_json::from_value(value)?]
    };
    Ok(drafts)
}
