// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed parameter descriptors for the analysis engine.
//!
//! The engine's parameters are described by declarative tables instead of
//! runtime introspection: one table for the engine constructor (global
//! parameters, shared by every method) and one per analysis method. The
//! HTTP layer publishes these descriptors as the request schema and the
//! pipeline processor uses them to marshal values before invocation.

use crate::method::AnalysisMethodName;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Value type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Str,
    Int,
    Float,
    Bool,
    File,
}

/// Description of one engine parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParamKind,
    pub is_list: bool,
    pub required: bool,
    pub default: Option<Value>,
    pub description: String,
}

impl ParamDescriptor {
    fn new(
        name: &str,
        kind: ParamKind,
        is_list: bool,
        required: bool,
        default: Option<Value>,
        description: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            kind,
            is_list,
            required,
            default,
            description: description.to_string(),
        }
    }
}

/// Parameters of the engine constructor, shared by every analysis method.
///
/// `input_file_path` is always a file list; the output folder naming
/// parameters are deliberately absent because the pipeline processor owns
/// the output directory of each run.
pub fn global_descriptors() -> Vec<ParamDescriptor> {
    vec![
        ParamDescriptor::new(
            "input_file_path",
            ParamKind::File,
            true,
            true,
            None,
            "Input file (Excel format) or list of input files. Can be a David analysis output, or RNAseq",
        ),
        ParamDescriptor::new(
            "sheet_name_paths",
            ParamKind::Str,
            false,
            false,
            Some(json!("pathways")),
            "Sheet name containing the pathway information (see docs). Has to apply to all input files in case of multiple.",
        ),
        ParamDescriptor::new(
            "sheet_name_genes",
            ParamKind::Str,
            false,
            false,
            Some(json!("gene_metrics")),
            "Sheet name for gene information (see docs). Has to apply to all input files in case of multiple.",
        ),
        ParamDescriptor::new(
            "genes_column",
            ParamKind::Str,
            false,
            false,
            Some(json!("gene_symbol")),
            "Column name for gene symbols in the sheet_name_genes",
        ),
        ParamDescriptor::new(
            "log2fc_column",
            ParamKind::Str,
            false,
            false,
            Some(json!("logFC")),
            "Column name for log2fc values in the sheet_name_genes",
        ),
        ParamDescriptor::new(
            "count_threshold",
            ParamKind::Int,
            false,
            false,
            Some(json!(2)),
            "Minimum number of genes per pathway, for pathway to be drawn.",
        ),
        ParamDescriptor::new(
            "pathway_pvalue",
            ParamKind::Float,
            false,
            false,
            None,
            "Raw p-value threshold for the pathways",
        ),
        ParamDescriptor::new(
            "input_label",
            ParamKind::Str,
            false,
            false,
            None,
            "Input label or list of labels for multiple inputs",
        ),
        ParamDescriptor::new(
            "benjamini_threshold",
            ParamKind::Float,
            false,
            false,
            None,
            "Benjamini Hochberg p-value threshold for the pathway",
        ),
        ParamDescriptor::new(
            "save_to_eps",
            ParamKind::Bool,
            false,
            false,
            Some(json!(false)),
            "Save the maps and colorscales or legends as seperate .eps files in addition to the .pdf exports",
        ),
        ParamDescriptor::new(
            "compounds_list",
            ParamKind::Str,
            true,
            false,
            None,
            "List of compound IDs to mapped in pathways if found.",
        ),
    ]
}

fn methylation_descriptors(with_probe_column: bool) -> Vec<ParamDescriptor> {
    let mut descriptors = vec![
        ParamDescriptor::new(
            "methylation_path",
            ParamKind::File,
            false,
            true,
            None,
            "Methylation data (Excel, CSV or TSV format)",
        ),
        ParamDescriptor::new(
            "methylation_pvalue",
            ParamKind::Str,
            false,
            false,
            None,
            "Column name for methylation p-value",
        ),
        ParamDescriptor::new(
            "methylation_genes",
            ParamKind::Str,
            false,
            false,
            None,
            "Column name for methylation gene symbols",
        ),
        ParamDescriptor::new(
            "methylation_pvalue_thresh",
            ParamKind::Float,
            false,
            false,
            Some(json!(0.05)),
            "P-value threshold for the methylation values",
        ),
        ParamDescriptor::new(
            "probes_to_cgs",
            ParamKind::Bool,
            false,
            false,
            Some(json!(false)),
            "If True, will correct the probes to positions, delete duplicated positions and keep the first CG.",
        ),
    ];
    if with_probe_column {
        descriptors.push(ParamDescriptor::new(
            "methylation_probe_column",
            ParamKind::Str,
            false,
            false,
            None,
            "Column name for the methylation probes.",
        ));
    }
    descriptors
}

fn mirna_descriptors(with_id_column: bool) -> Vec<ParamDescriptor> {
    let mut descriptors = vec![
        ParamDescriptor::new(
            "miRNA_path",
            ParamKind::File,
            false,
            true,
            None,
            "miRNA data (Excel, CSV or TSV format)",
        ),
        ParamDescriptor::new(
            "miRNA_pvalue",
            ParamKind::Str,
            false,
            false,
            None,
            "Column name for miRNA p-value",
        ),
        ParamDescriptor::new(
            "miRNA_genes",
            ParamKind::Str,
            false,
            false,
            None,
            "Column name for miRNA gene symbols",
        ),
        ParamDescriptor::new(
            "miRNA_pvalue_thresh",
            ParamKind::Float,
            false,
            false,
            Some(json!(0.05)),
            "P-value threshold for the miRNA values",
        ),
    ];
    if with_id_column {
        descriptors.push(ParamDescriptor::new(
            "miRNA_ID_column",
            ParamKind::Str,
            false,
            false,
            None,
            "Column name for the miRNA IDs.",
        ));
    }
    descriptors
}

/// Parameters specific to one analysis method.
pub fn method_descriptors(method: AnalysisMethodName) -> Vec<ParamDescriptor> {
    match method {
        AnalysisMethodName::SingleInputGenes
        | AnalysisMethodName::SingleInputTranscripts
        | AnalysisMethodName::SingleInputGenesBulkMapping
        | AnalysisMethodName::MultipleInputs => Vec::new(),
        AnalysisMethodName::SingleInputWithMethylation => methylation_descriptors(false),
        AnalysisMethodName::SingleInputWithMethylationQuantification => {
            methylation_descriptors(true)
        }
        AnalysisMethodName::SingleInputWithMirna => mirna_descriptors(false),
        AnalysisMethodName::SingleInputWithMirnaQuantification => mirna_descriptors(true),
        AnalysisMethodName::SingleInputWithMethylationAndMirna => {
            let mut descriptors = methylation_descriptors(false);
            descriptors.extend(mirna_descriptors(false));
            descriptors
        }
    }
}

/// Find a descriptor by name, scanning globals first and then every
/// method's parameters.
pub fn find(param_name: &str) -> Option<ParamDescriptor> {
    if let Some(descriptor) = global_descriptors()
        .into_iter()
        .find(|d| d.name == param_name)
    {
        return Some(descriptor);
    }
    AnalysisMethodName::ALL.iter().find_map(|method| {
        method_descriptors(*method)
            .into_iter()
            .find(|d| d.name == param_name)
    })
}

#[cfg(test)]
#[path = "params_tests.rs"]
mod tests;
