// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Catalog of the MetaKEGG analysis methods a run can be committed to.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Named analysis method of the external MetaKEGG engine.
///
/// The serialized form is the method name as the engine spells it; it is
/// used in URLs, in persisted run records, and in the generated output
/// zip file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnalysisMethodName {
    #[serde(rename = "single_input_genes")]
    SingleInputGenes,
    #[serde(rename = "single_input_transcripts")]
    SingleInputTranscripts,
    #[serde(rename = "single_input_genes_bulk_mapping")]
    SingleInputGenesBulkMapping,
    #[serde(rename = "multiple_inputs")]
    MultipleInputs,
    #[serde(rename = "single_input_with_methylation")]
    SingleInputWithMethylation,
    #[serde(rename = "single_input_with_methylation_quantification")]
    SingleInputWithMethylationQuantification,
    #[serde(rename = "single_input_with_miRNA")]
    SingleInputWithMirna,
    #[serde(rename = "single_input_with_miRNA_quantification")]
    SingleInputWithMirnaQuantification,
    #[serde(rename = "single_input_with_methylation_and_miRNA")]
    SingleInputWithMethylationAndMirna,
}

/// Client-facing description of an analysis method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisMethod {
    pub name: String,
    pub display_name: String,
    pub internal_id: u16,
    pub desc: Option<String>,
}

impl AnalysisMethodName {
    pub const ALL: [AnalysisMethodName; 9] = [
        AnalysisMethodName::SingleInputGenes,
        AnalysisMethodName::SingleInputTranscripts,
        AnalysisMethodName::SingleInputGenesBulkMapping,
        AnalysisMethodName::MultipleInputs,
        AnalysisMethodName::SingleInputWithMethylation,
        AnalysisMethodName::SingleInputWithMethylationQuantification,
        AnalysisMethodName::SingleInputWithMirna,
        AnalysisMethodName::SingleInputWithMirnaQuantification,
        AnalysisMethodName::SingleInputWithMethylationAndMirna,
    ];

    /// Look up a method by its engine-spelled name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.as_str() == name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SingleInputGenes => "single_input_genes",
            Self::SingleInputTranscripts => "single_input_transcripts",
            Self::SingleInputGenesBulkMapping => "single_input_genes_bulk_mapping",
            Self::MultipleInputs => "multiple_inputs",
            Self::SingleInputWithMethylation => "single_input_with_methylation",
            Self::SingleInputWithMethylationQuantification => {
                "single_input_with_methylation_quantification"
            }
            Self::SingleInputWithMirna => "single_input_with_miRNA",
            Self::SingleInputWithMirnaQuantification => "single_input_with_miRNA_quantification",
            Self::SingleInputWithMethylationAndMirna => {
                "single_input_with_methylation_and_miRNA"
            }
        }
    }

    pub fn internal_id(&self) -> u16 {
        match self {
            Self::SingleInputGenes => 1,
            Self::SingleInputTranscripts => 2,
            Self::SingleInputGenesBulkMapping => 3,
            Self::MultipleInputs => 4,
            Self::SingleInputWithMethylation => 5,
            Self::SingleInputWithMethylationQuantification => 6,
            Self::SingleInputWithMirna => 7,
            Self::SingleInputWithMirnaQuantification => 8,
            Self::SingleInputWithMethylationAndMirna => 9,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::SingleInputGenes => "Single Input Genes Analysis",
            Self::SingleInputTranscripts => "Single Input Transcripts Analysis",
            Self::SingleInputGenesBulkMapping => "Single input genes bulk mapping Analysis",
            Self::MultipleInputs => "multiple inputs Analysis",
            Self::SingleInputWithMethylation => "single input with methylation",
            Self::SingleInputWithMethylationQuantification => {
                "single input with methylation quantification Analysis"
            }
            Self::SingleInputWithMirna => "single input with miRNA Analysis",
            Self::SingleInputWithMirnaQuantification => {
                "single input with miRNA quantification Analysis"
            }
            Self::SingleInputWithMethylationAndMirna => {
                "single input with methylation and miRNA Analysis"
            }
        }
    }

    pub fn desc(&self) -> &'static str {
        match self {
            Self::SingleInputGenes => "Perform the Single Input Analysis for Gene IDs.",
            Self::SingleInputTranscripts => {
                "Perform the Single Input Analysis for Transcript IDs."
            }
            Self::SingleInputGenesBulkMapping => {
                "Perform a single input analysis with bulk mapping for genes."
            }
            Self::MultipleInputs => "Perform the Multiple Inputs Analysis.",
            Self::SingleInputWithMethylation => "Perform Single Input Analysis with Methylation.",
            Self::SingleInputWithMethylationQuantification => {
                "Perform Single Input Analysis with methylation quantification."
            }
            Self::SingleInputWithMirna => "Perform Single Input Analysis with miRNA.",
            Self::SingleInputWithMirnaQuantification => {
                "Perform Single Input Analysis with miRNA quantification."
            }
            Self::SingleInputWithMethylationAndMirna => {
                "Perform Single Input Analysis with methylation and miRNA."
            }
        }
    }

    /// Build the client-facing DTO for this method.
    pub fn describe(&self) -> AnalysisMethod {
        AnalysisMethod {
            name: self.as_str().to_string(),
            display_name: self.display_name().to_string(),
            internal_id: self.internal_id(),
            desc: Some(self.desc().to_string()),
        }
    }
}

impl fmt::Display for AnalysisMethodName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
#[path = "method_tests.rs"]
mod tests;
