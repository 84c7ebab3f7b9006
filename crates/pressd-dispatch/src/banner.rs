// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Banner & virtual documents: `job-sheets=start,end` wraps a
// job's real payload with synthetic cover-page documents rendered from a
// template at read time, using the full `{?name}` substitution
// vocabulary rather than a single static job name.

use pressd_core::model::{BannerSlot, Document, Job, SyntheticDocument};

/// MIME type CUPS uses for banner pages.
pub const BANNER_MIME_TYPE: &str = "application/vnd.cups-banner";

const DEFAULT_TEMPLATE: &str = "\
{?printer-name}
Job #{?job-id}: {?job-name}
Submitted by: {?job-originating-user-name}
Pages: {?job-impressions}
";

/// Expand `{?printer-name}`, `{?job-id}`, `{?job-originating-user-name}`,
/// `{?job-name}`, and `{?job-impressions}` against a job. Unknown
/// `{?...}` placeholders are left unexpanded rather than erroring, since
/// a banner template is content, not a language with a defined error mode.
pub fn expand_template(template: &str, printer_name: &str, job: &Job) -> String {
    template
        .replace("{?printer-name}", printer_name)
        .replace("{?job-id}", &job.id.to_string())
        .replace("{?job-originating-user-name}", &job.user_name)
        .replace("{?job-name}", &job.name)
        .replace("{?job-impressions}", &job.impressions.to_string())
}

/// Render the text of a banner page, falling back to
/// [`DEFAULT_TEMPLATE`] when the destination has no configured template for
/// this slot.
pub fn render_banner_text(template: Option<&str>, printer_name: &str, job: &Job) -> String {
    expand_template(template.unwrap_or(DEFAULT_TEMPLATE), printer_name, job)
}

/// Build the `[start] stored-documents... [end]` ordinal sequence for a
/// job's `job-sheets` setting `job_sheets` is the job's
/// resolved `(start, end)` pair — `"none"` means no banner in that slot.
/// Only `Document` values carrying ordinals are returned; the caller merges
/// these with the job's stored documents to answer `Get-Job-Attributes`
/// `number-of-documents`/ordinal listings.
pub fn banner_documents(job_sheets: &(String, String), job: &Job, stored_document_count: i32) -> Vec<Document> {
    let mut docs = Vec::new();
    let has_start = job_sheets.0 != "none";
    let has_end = job_sheets.1 != "none";

    if has_start {
        docs.push(Document::Synthetic(SyntheticDocument {
            job_id: job.id,
            ordinal: 1,
            name: format!("{}-banner-start", job_sheets.0),
            which: BannerSlot::Start,
        }));
    }
    if has_end {
        let ordinal = stored_document_count + if has_start { 2 } else { 1 };
        docs.push(Document::Synthetic(SyntheticDocument {
            job_id: job.id,
            ordinal,
            name: format!("{}-banner-end", job_sheets.1),
            which: BannerSlot::End,
        }));
    }
    docs
}

/// The ordinal offset real stored documents should start at, given whether
/// a start banner precedes them.
pub fn first_stored_ordinal(job_sheets: &(String, String)) -> i32 {
    if job_sheets.0 != "none" {
        2
    } else {
        1
    }
}
