//! Migration report
//!
//! Collects deduplicated [`ReportEntry`]s, injects them as comments on the
//! annotated node and derives coverage ratios from the processed element
//! count.

use crate::catalog::{Catalog, Level};
use crate::entry::{EntryKey, ReportEntry, COMPATIBILITY_PREFIX};
use crate::error::ReportError;
use crate::template;
use indexmap::{IndexMap, IndexSet};
use mig_project::ProjectType;
use mig_tree::{Document, NodeId, NodeRef};
use serde::Serialize;
use std::path::Path;

/// Diagnostic sink shared by every step of a run
#[derive(Debug, Default)]
pub struct Report {
    catalog: Catalog,
    entries: IndexMap<EntryKey, ReportEntry>,
    project_type: Option<ProjectType>,
    project_name: Option<String>,
    processed_elements: usize,
}

/// Serializable view of a finished report
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    /// Project type, once initialized
    pub project_type: Option<ProjectType>,
    /// Project name, once initialized
    pub project_name: Option<String>,
    /// Elements counted as processed
    pub processed_elements: usize,
    /// `None` when nothing was processed
    pub success_ratio: Option<f64>,
    /// `None` when nothing was processed
    pub error_ratio: Option<f64>,
    /// Entries in report order
    pub entries: Vec<ReportEntry>,
}

/// Comments may not contain `--`
fn comment_safe(text: &str) -> String {
    let mut out = text.replace("--", "- -");
    while out.contains("--") {
        out = out.replace("--", "- -");
    }
    if out.ends_with('-') {
        out.push(' ');
    }
    out
}

#[allow(clippy::cast_precision_loss)]
fn ratio(count: usize, total: usize) -> f64 {
    (count as f64 / total as f64).clamp(0.0, 1.0)
}

impl Report {
    /// Report backed by `catalog`
    #[must_use]
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            ..Self::default()
        }
    }

    /// Report backed by the embedded catalog
    ///
    /// # Errors
    /// Returns error if the embedded catalog is invalid
    pub fn with_default_catalog() -> Result<Self, ReportError> {
        Ok(Self::new(Catalog::embedded()?))
    }

    /// Catalog used for templated entries
    #[inline]
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Record project identity
    pub fn initialize(&mut self, project_type: ProjectType, project_name: impl Into<String>) {
        self.project_type = Some(project_type);
        self.project_name = Some(project_name.into());
    }

    /// Report a catalog entry, with `params` substituted into its template
    ///
    /// Returns whether a new entry was recorded.
    ///
    /// # Errors
    /// - `ReportError::Catalog` if `key` is unknown
    /// - `ReportError::Tree` if the comment cannot be injected
    pub fn report<S: AsRef<str>>(
        &mut self,
        key: &str,
        doc: &mut Document,
        element: NodeId,
        annotate: Option<NodeId>,
        params: &[S],
    ) -> Result<bool, ReportError> {
        let entry = self.catalog.get(key)?;
        let level = entry.level;
        let message = template::render(&entry.message, params);
        let links = entry.doc_links.clone();
        self.report_message(level, doc, element, annotate, message, &links)
    }

    /// Report a computed message
    ///
    /// The entry targets `annotate` when given, `element` otherwise. A new
    /// entry with an annotation target is injected as comments at the start
    /// of that node; when `element` is a different node it is serialized into
    /// one more comment after its own nested comments are stripped.
    ///
    /// # Errors
    /// Returns error if the comment cannot be injected
    pub fn report_message(
        &mut self,
        level: Level,
        doc: &mut Document,
        element: NodeId,
        annotate: Option<NodeId>,
        message: impl Into<String>,
        doc_links: &[String],
    ) -> Result<bool, ReportError> {
        let target = annotate.unwrap_or(element);
        let entry = ReportEntry {
            level,
            element: doc.node_ref(target),
            element_path: doc.effective_path(target),
            file_path: doc.path().map(|p| p.to_string_lossy().into_owned()),
            message: message.into(),
            doc_links: doc_links.to_vec(),
            already_compatible: doc
                .namespace(target)
                .is_some_and(|ns| ns.prefix() == COMPATIBILITY_PREFIX),
        };

        let key = entry.key();
        if self.entries.contains_key(&key) {
            return Ok(false);
        }

        if let Some(annotated) = annotate {
            let mut lines = entry.comment_lines();
            if element != annotated {
                doc.remove_nested_comments(element);
                lines.push(doc.element_to_string(element)?);
            }
            for (i, line) in lines.iter().enumerate() {
                doc.insert_comment_at(annotated, i, comment_safe(line))?;
            }
        }

        tracing::debug!("{} at {}: {}", entry.level, entry.element_path, entry.message);
        self.entries.insert(key, entry);
        Ok(true)
    }

    /// Add to the processed element count
    pub fn add_processed_elements(&mut self, count: usize) {
        self.processed_elements += count;
    }

    /// Processed element count
    #[inline]
    #[must_use]
    pub fn processed_elements(&self) -> usize {
        self.processed_elements
    }

    /// `1 - flagged / processed`, where flagged counts distinct elements with
    /// an entry not marked already compatible; `None` when nothing was processed
    #[must_use]
    pub fn success_ratio(&self) -> Option<f64> {
        if self.processed_elements == 0 {
            return None;
        }
        let flagged: IndexSet<NodeRef> = self
            .entries
            .values()
            .filter(|e| !e.already_compatible)
            .map(|e| e.element)
            .collect();
        Some(1.0 - ratio(flagged.len(), self.processed_elements))
    }

    /// `errors / processed`, where errors counts distinct elements with an
    /// error entry; `None` when nothing was processed
    #[must_use]
    pub fn error_ratio(&self) -> Option<f64> {
        if self.processed_elements == 0 {
            return None;
        }
        let errors: IndexSet<NodeRef> = self
            .entries
            .values()
            .filter(|e| e.level == Level::Error)
            .map(|e| e.element)
            .collect();
        Some(ratio(errors.len(), self.processed_elements))
    }

    /// Rewrite the file path of entries recorded against `old`
    pub fn update_entry_file_path(&mut self, old: &Path, new: &Path) {
        let old = old.to_string_lossy();
        let new = new.to_string_lossy().into_owned();
        for entry in self.entries.values_mut() {
            if entry.file_path.as_deref() == Some(old.as_ref()) {
                entry.file_path = Some(new.clone());
            }
        }
    }

    /// Entries in report order
    pub fn entries(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries.values()
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries at a level
    #[must_use]
    pub fn count(&self, level: Level) -> usize {
        self.entries.values().filter(|e| e.level == level).count()
    }

    /// Snapshot for serialization
    #[must_use]
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            project_type: self.project_type,
            project_name: self.project_name.clone(),
            processed_elements: self.processed_elements,
            success_ratio: self.success_ratio(),
            error_ratio: self.error_ratio(),
            entries: self.entries.values().cloned().collect(),
        }
    }

    /// Write the summary as pretty JSON
    ///
    /// # Errors
    /// Returns error if serialization or the write fails
    pub fn write_json(&self, path: &Path) -> Result<(), ReportError> {
        let json = serde_json::to_string_pretty(&self.summary())?;
        std::fs::write(path, json).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mig_tree::NodeKind;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const APP: &str = r#"<mule xmlns="urn:core" xmlns:compatibility="urn:compat">
        <flow name="main">
            <logger message="a"/>
            <compatibility:outbound-properties-to-var/>
        </flow>
    </mule>"#;

    fn setup() -> (Report, Document, NodeId, NodeId) {
        let mut doc = Document::parse(APP).unwrap();
        doc.set_path("src/main/mule/app.xml");
        let flow = doc.element_children(doc.root())[0];
        let logger = doc.element_children(flow)[0];
        (Report::with_default_catalog().unwrap(), doc, flow, logger)
    }

    fn comments(doc: &Document, node: NodeId) -> Vec<String> {
        doc.children(node)
            .iter()
            .filter_map(|c| match doc.kind(*c) {
                Some(NodeKind::Comment(text)) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn templated_entry_is_rendered_and_injected() {
        let (mut report, mut doc, _, logger) = setup();
        let added = report
            .report("components.deprecated", &mut doc, logger, Some(logger), &["logger", "core"])
            .unwrap();
        assert!(added);
        assert_eq!(
            comments(&doc, logger),
            vec!["Migration WARN: Element logger of type core is deprecated"]
        );
        let entry = report.entries().next().unwrap();
        assert_eq!(entry.file_path.as_deref(), Some("src/main/mule/app.xml"));
        assert_eq!(entry.element_path, "/mule/flow/logger");
    }

    #[test]
    fn duplicate_report_is_ignored() {
        let (mut report, mut doc, _, logger) = setup();
        for _ in 0..2 {
            report
                .report_message(Level::Error, &mut doc, logger, Some(logger), "unsupported", &[])
                .unwrap();
        }
        assert_eq!(report.len(), 1);
        assert_eq!(comments(&doc, logger).len(), 1);
    }

    #[test]
    fn different_reported_node_is_serialized() {
        let (mut report, mut doc, flow, logger) = setup();
        doc.append_comment(logger, "old note").unwrap();
        report
            .report("raml.invalid", &mut doc, logger, Some(flow), &["bad header"])
            .unwrap();
        let lines = comments(&doc, flow);
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Migration ERROR: The API contract could not be parsed"));
        assert!(lines[0].ends_with("bad header"));
        assert_eq!(lines[1], "    For more information refer to:");
        assert!(lines[2].starts_with("        * https://"));
        assert_eq!(lines[3], r#"<logger xmlns="urn:core" message="a"/>"#);
        // Comments injected first, original content follows
        assert!(matches!(doc.kind(doc.children(flow)[4]), Some(NodeKind::Element(_))));
    }

    #[test]
    fn entry_without_annotation_is_recorded_only() {
        let (mut report, mut doc, flow, _) = setup();
        assert!(report
            .report_message(Level::Info, &mut doc, flow, None, "noted", &[])
            .unwrap());
        assert!(comments(&doc, flow).is_empty());
        assert_eq!(report.len(), 1);
    }

    #[test]
    fn unknown_key_fails() {
        let (mut report, mut doc, flow, _) = setup();
        let err = report.report("nope.nothing", &mut doc, flow, Some(flow), &[] as &[&str]);
        assert!(matches!(err, Err(ReportError::Catalog(_))));
    }

    #[test]
    fn ratios_are_undefined_without_processed_elements() {
        let (report, ..) = setup();
        assert_eq!(report.success_ratio(), None);
        assert_eq!(report.error_ratio(), None);
    }

    #[test]
    fn ratios_count_distinct_elements() {
        let (mut report, mut doc, flow, logger) = setup();
        let compat = doc.element_children(flow)[1];
        report.add_processed_elements(4);
        report.report_message(Level::Error, &mut doc, logger, Some(logger), "one", &[]).unwrap();
        report.report_message(Level::Error, &mut doc, logger, Some(logger), "two", &[]).unwrap();
        report.report_message(Level::Warn, &mut doc, compat, Some(compat), "compat", &[]).unwrap();
        report.report_message(Level::Warn, &mut doc, flow, Some(flow), "review", &[]).unwrap();

        // Flagged: logger and flow; the compatibility element does not count
        assert_eq!(report.success_ratio(), Some(0.5));
        assert_eq!(report.error_ratio(), Some(0.25));
    }

    #[test]
    fn file_paths_follow_relocation() {
        let (mut report, mut doc, flow, _) = setup();
        report.report_message(Level::Info, &mut doc, flow, None, "noted", &[]).unwrap();
        report.update_entry_file_path(Path::new("src/main/mule/app.xml"), Path::new("src/main/mule/moved.xml"));
        assert_eq!(
            report.entries().next().unwrap().file_path.as_deref(),
            Some("src/main/mule/moved.xml")
        );
    }

    #[test]
    fn summary_serializes() {
        let (mut report, mut doc, flow, _) = setup();
        report.initialize(ProjectType::Mule4Application, "orders");
        report.add_processed_elements(2);
        report.report_message(Level::Error, &mut doc, flow, Some(flow), "x", &[]).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        report.write_json(&path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["projectType"], "MULE_FOUR_APPLICATION");
        assert_eq!(json["projectName"], "orders");
        assert_eq!(json["errorRatio"], 0.5);
        assert_eq!(json["entries"][0]["message"], "x");
    }

    #[test]
    fn comment_text_never_contains_double_dash() {
        assert_eq!(comment_safe("a--b"), "a- -b");
        assert_eq!(comment_safe("a---"), "a- - - ");
    }

    proptest! {
        #[test]
        fn ratios_stay_in_bounds(processed in 1usize..20, flagged in 0usize..6, errors in 0usize..6) {
            let mut doc = Document::parse("<mule/>").unwrap();
            let root = doc.root();
            let mut report = Report::default();
            report.add_processed_elements(processed);
            for i in 0..flagged {
                let node = doc.create_element(format!("w{i}"), mig_tree::Namespace::none());
                doc.append_child(root, node).unwrap();
                report.report_message(Level::Warn, &mut doc, node, None, "w", &[]).unwrap();
            }
            for i in 0..errors {
                let node = doc.create_element(format!("e{i}"), mig_tree::Namespace::none());
                doc.append_child(root, node).unwrap();
                report.report_message(Level::Error, &mut doc, node, None, "e", &[]).unwrap();
            }
            let success = report.success_ratio().unwrap();
            let error = report.error_ratio().unwrap();
            prop_assert!((0.0..=1.0).contains(&success));
            prop_assert!((0.0..=1.0).contains(&error));
        }
    }
}
