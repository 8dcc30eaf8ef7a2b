//! HTML flowchart of the pipeline stages.
//!
//! The page renders a Mermaid diagram client-side; nothing here reads the
//! report configuration or touches the network.

use crate::pipeline::Stage;
use std::fmt::Write;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Default location of the flowchart page.
pub const DEFAULT_PLOT_PATH: &str = "report_creator_flow.html";

const MERMAID_CDN: &str = "https://cdn.jsdelivr.net/npm/mermaid@10/dist/mermaid.min.js";

/// Mermaid `flowchart` source describing every stage and transition.
pub fn flow_diagram() -> String {
    let mut chart = String::from("flowchart TD\n");

    for stage in Stage::ALL {
        writeln!(chart, "    {stage}[\"{stage}<br/>{}\"]", stage.describe()).unwrap();
    }
    for stage in Stage::ALL {
        if let Some(next) = stage.next() {
            writeln!(chart, "    {stage} --> {next}").unwrap();
        }
    }

    chart
}

/// Wrap the diagram in a standalone HTML page.
pub fn flow_html() -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <title>Report creator flow</title>\n\
         <script src=\"{MERMAID_CDN}\"></script>\n\
         </head>\n\
         <body>\n\
         <pre class=\"mermaid\">\n{}</pre>\n\
         <script>mermaid.initialize({{ startOnLoad: true }});</script>\n\
         </body>\n\
         </html>\n",
        flow_diagram()
    )
}

/// Write the flowchart page to `path`.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_flow_plot(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, flow_html()).await?;
    info!("Flow visualization saved");
    Ok(())
}
