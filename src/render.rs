use crate::context::ReportContext;
use crate::model::report::{Report, ReportData};
use crate::sources::ReportSource;

/// Renders the finished report as pretty JSON or as text, source by source.
pub fn render(
    results: &[(&dyn ReportSource, ReportData)],
    ctx: &ReportContext,
) -> serde_json::Result<String> {
    if ctx.flags.json {
        let report = Report(results.iter().map(|(_, data)| data.clone()).collect());
        return report.to_json_pretty().map(|json| json + "\n");
    }

    let mut out = String::new();
    for (source, data) in results {
        out.push_str(&format!("\n{} REPORT\n", data.name.to_uppercase()));
        out.push_str(&source.render_text(data, ctx));
        if !data.failures.is_empty() {
            out.push_str(&format!("\nINCOMPLETE: {} request(s) failed\n", data.failures.len()));
            for failure in &data.failures {
                out.push_str(&format!("! {failure}\n"));
            }
        }
    }
    Ok(out)
}
