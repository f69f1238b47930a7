use crate::config::OutputConfig;
use crate::controller::{tooltip_anchor, View};
use crate::data::LOADING_MESSAGE;
use crate::legend::Legend;
use crate::path::format_number;
use crate::scene::Scene;
use crate::types::TooltipState;
use anyhow::{Context, Result};
use std::fmt::{self, Write};
use std::fs;
use std::path::Path;
use tracing::info;

const TITLE: &str = "United States Educational Attainment";
const DESCRIPTION: &str = "Percentage of adults age 25 and older with a bachelor's degree or higher(2010-2014)";

const STYLE: &str = "body{font-family:sans-serif;text-align:center}\
#main{display:inline-block}\
#tooltip{background:#333;color:#fff;padding:4px 8px;border-radius:3px;pointer-events:none;font-size:12px}\
.county:hover{stroke:#000;stroke-width:0.5}";

// Hover events are forwarded to the server, which owns the tooltip state.
// Responses that arrive after a newer one has been applied are dropped.
const HOVER_SCRIPT: &str = r#"<script>
let issued = 0;
let applied = 0;
function showTooltip(t) {
  let el = document.getElementById('tooltip');
  if (!el) {
    el = document.createElement('div');
    el.id = 'tooltip';
    el.style.position = 'absolute';
    el.style.opacity = '0.9';
    document.body.appendChild(el);
  }
  el.textContent = t.content;
  el.style.left = t.left + 'px';
  el.style.top = t.top + 'px';
  el.style.display = t.visible ? 'block' : 'none';
}
function send(url) {
  const seq = ++issued;
  fetch(url).then(function (r) { return r.json(); }).then(function (t) {
    if (seq > applied) {
      applied = seq;
      showTooltip(t);
    }
  });
}
document.querySelectorAll('.county').forEach(function (county) {
  county.addEventListener('mouseover', function (ev) {
    send('/api/hover?fips=' + county.dataset.fips + '&x=' + ev.pageX + '&y=' + ev.pageY);
  });
  county.addEventListener('mouseout', function () {
    send('/api/unhover?fips=' + county.dataset.fips);
  });
});
</script>"#;

pub fn render_svg(scene: &Scene) -> String {
    let mut out = String::with_capacity(scene.counties.len() * 160 + scene.state_borders.len() + 4096);
    // writing into a String cannot fail
    let _ = write_svg(&mut out, scene);
    out
}

fn write_svg(out: &mut String, scene: &Scene) -> fmt::Result {
    write!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = format_number(scene.width),
        h = format_number(scene.height),
    )?;

    out.push_str(r#"<g class="counties">"#);
    for county in &scene.counties {
        let fips = county.id.as_ref().map(|id| id.to_string()).unwrap_or_default();
        write!(
            out,
            r#"<path class="county" data-fips="{}" data-education="{}" fill="{}" d="{}"/>"#,
            escape(&fips),
            county.education,
            county.fill,
            county.path
        )?;
    }
    out.push_str("</g>");

    write!(
        out,
        r#"<path class="states" fill="none" stroke="white" stroke-linejoin="round" d="{}"/>"#,
        scene.state_borders
    )?;

    write_legend(out, &scene.legend)?;
    out.push_str("</svg>");
    Ok(())
}

fn write_legend(out: &mut String, legend: &Legend) -> fmt::Result {
    write!(
        out,
        r#"<g id="legend" transform="translate({},{})">"#,
        format_number(legend.origin.0),
        format_number(legend.origin.1)
    )?;
    for rect in &legend.rects {
        write!(
            out,
            r#"<rect x="{}" y="0" width="{}" height="{}" fill="{}"/>"#,
            format_number(rect.x),
            format_number(rect.width),
            format_number(legend.height),
            rect.fill
        )?;
    }

    write!(
        out,
        r#"<g class="axis" transform="translate(0,{})" font-size="10" text-anchor="middle">"#,
        format_number(legend.height)
    )?;
    for tick in &legend.ticks {
        write!(
            out,
            r#"<g class="tick" transform="translate({},0)"><line stroke="currentColor" y2="{}"/><text fill="currentColor" y="{}" dy="0.71em">{}</text></g>"#,
            format_number(tick.x),
            format_number(legend.tick_size),
            format_number(legend.tick_size + 3.0),
            escape(&tick.label)
        )?;
    }
    out.push_str("</g></g>");
    Ok(())
}

/// Full page for a view. `interactive` adds the script that forwards hover
/// events to the server.
pub fn render_document(view: &View, tooltip: &TooltipState, interactive: bool) -> String {
    let mut out = String::new();
    let _ = write_document(&mut out, view, tooltip, interactive);
    out
}

fn write_document(out: &mut String, view: &View, tooltip: &TooltipState, interactive: bool) -> fmt::Result {
    write!(
        out,
        r#"<!DOCTYPE html><html lang="pt-BR"><head><meta charset="utf-8"><title>{TITLE}</title><style>{STYLE}</style></head><body><div id="main"><div id="title"><h1>{TITLE}</h1></div><div id="description"><h2>{}</h2></div>"#,
        escape(DESCRIPTION)
    )?;

    match view {
        View::Loading => write!(out, "<p>{}</p>", escape(LOADING_MESSAGE))?,
        View::Failed(message) => write!(out, "<p>{}</p>", escape(message))?,
        View::Ready(scene) => {
            out.push_str("<div>");
            out.push_str(&render_svg(scene));
            if tooltip.visible {
                let (left, top) = tooltip_anchor(tooltip);
                write!(
                    out,
                    r#"<div id="tooltip" style="opacity: 0.9; position: absolute; left: {}px; top: {}px;">{}</div>"#,
                    format_number(left),
                    format_number(top),
                    escape(&tooltip.content)
                )?;
            }
            out.push_str("</div>");
        }
    }

    out.push_str("</div>");
    if interactive && matches!(view, View::Ready(_)) {
        out.push_str(HOVER_SCRIPT);
    }
    out.push_str("</body></html>");
    Ok(())
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Writes the SVG and, when configured, the standalone page.
pub fn write_outputs(output: &OutputConfig, view: &View, tooltip: &TooltipState) -> Result<()> {
    if let View::Ready(scene) = view {
        write_file(&output.svg, &render_svg(scene))?;
        info!(path = ?output.svg, counties = scene.counties.len(), "svg written");
    }
    if let Some(html) = &output.html {
        write_file(html, &render_document(view, tooltip, false))?;
        info!(path = ?html, "html written");
    }
    Ok(())
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create directory {:?}", parent))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::MapController;
    use crate::data::LOAD_ERROR_MESSAGE;
    use crate::fixtures;
    use crate::projection::Preprojected;
    use crate::scale::FALLBACK_FILL;
    use crate::types::Pointer;
    use std::sync::Arc;

    fn ready() -> (MapController, Arc<Scene>) {
        let mut controller = MapController::new(Box::new(Preprojected));
        controller.set_data(fixtures::map_data()).unwrap();
        let scene = controller.scene().unwrap();
        (controller, scene)
    }

    #[test]
    fn svg_carries_inspectable_county_attributes() {
        let (_, scene) = ready();
        let svg = render_svg(&scene);
        assert!(svg.starts_with(r#"<svg xmlns="http://www.w3.org/2000/svg" width="960" height="600""#));
        assert!(svg.contains(r##"<path class="county" data-fips="1001" data-education="10" fill="#f7fcf5" d="M0,0L10,0L10,10L0,10Z"/>"##));
        assert!(svg.contains(&format!(
            r#"data-fips="9999" data-education="0" fill="{FALLBACK_FILL}""#
        )));
        assert!(svg.contains(r#"fill="none" stroke="white" stroke-linejoin="round""#));
    }

    #[test]
    fn svg_draws_legend() {
        let (_, scene) = ready();
        let svg = render_svg(&scene);
        assert!(svg.contains(r#"<g id="legend" transform="translate(540,560)">"#));
        assert_eq!(svg.matches("<rect ").count(), 9);
        assert_eq!(svg.matches(r#"class="tick""#).count(), 10);
        assert!(svg.contains(">10%</text>"));
        assert!(svg.contains(">50%</text>"));
    }

    #[test]
    fn document_shows_loading_and_error_text() {
        let tooltip = TooltipState::default();
        let loading = render_document(&View::Loading, &tooltip, false);
        assert!(loading.contains("<p>Carregando dados...</p>"));
        assert!(!loading.contains("<svg"));

        let failed = render_document(&View::Failed(LOAD_ERROR_MESSAGE.into()), &tooltip, true);
        assert!(failed.contains(LOAD_ERROR_MESSAGE));
        assert!(!failed.contains("<svg"));
        assert!(!failed.contains("<script>"));
    }

    #[test]
    fn document_places_visible_tooltip_at_offset() {
        let (mut controller, scene) = ready();
        controller.hover_in(1003, Pointer { x: 300.0, y: 400.0 });
        let page = render_document(&View::Ready(Arc::clone(&scene)), controller.tooltip(), true);
        assert!(page.contains(
            r#"<div id="tooltip" style="opacity: 0.9; position: absolute; left: 310px; top: 372px;">Baldwin County, AL: 50%</div>"#
        ));
        assert!(page.contains("<script>"));
        assert!(page.contains("'/api/unhover?fips=' + county.dataset.fips"));
        assert!(page.contains("if (seq > applied)"));

        controller.hover_out(Some(1003));
        let page = render_document(&View::Ready(scene), controller.tooltip(), true);
        assert!(!page.contains(r#"id="tooltip""#));
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape(r#"<a href="x">&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;&lt;/a&gt;");
    }

    #[test]
    fn writes_configured_outputs() {
        let (controller, scene) = ready();
        let dir = tempfile::tempdir().unwrap();
        let output = OutputConfig {
            svg: dir.path().join("out/map.svg"),
            html: Some(dir.path().join("map.html")),
            geojson_dir: dir.path().join("geojson"),
        };
        write_outputs(&output, &View::Ready(scene), controller.tooltip()).unwrap();
        let svg = fs::read_to_string(&output.svg).unwrap();
        assert!(svg.contains("data-fips=\"1003\""));
        assert!(fs::read_to_string(dir.path().join("map.html")).unwrap().contains(TITLE));
    }
}
