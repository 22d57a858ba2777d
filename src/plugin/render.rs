//! Source templates of generated modules.
//!
//! Record shape (JavaScript):
//!
//! ```js
//! import avif from "/src/img/photo.png?avif";
//! import fallback from "/src/img/photo.png?fallback";
//! export default { avif, fallback };
//! ```
//!
//! Component shape (Svelte), rendering a `<picture>` through the configured
//! picture component:
//!
//! ```svelte
//! <script lang="ts">
//! import avif from "/src/img/photo.png?avif";
//! import fallback from "/src/img/photo.png?fallback";
//! import Picture from '$lib/Picture.svelte';
//! const src = { fallback, avif };
//! </script>
//! <Picture {src} {...$$restProps} />
//! ```

use serde::{Deserialize, Serialize};

/// Shape of the module generated for an optimize request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleShape {
    /// `export default { avif, webp, fallback }`
    #[default]
    Record,
    /// Svelte component wrapping the picture component.
    Component,
}

/// Render an optimize module.
///
/// `sources` are `(key, id)` pairs of the resolved modern derivatives in
/// priority order; `fallback` is always imported.
pub fn optimize_module(
    shape: ModuleShape,
    component: &str,
    sources: &[(&str, String)],
    fallback: &str,
) -> String {
    let mut imports: Vec<String> = sources
        .iter()
        .map(|(key, id)| import_default(key, id))
        .collect();
    imports.push(import_default("fallback", fallback));

    match shape {
        ModuleShape::Record => {
            let keys = sources
                .iter()
                .map(|(key, _)| *key)
                .chain(["fallback"])
                .collect::<Vec<_>>()
                .join(", ");
            format!("{}\nexport default {{ {keys} }};\n", imports.join("\n"))
        }
        ModuleShape::Component => {
            let keys = ["fallback"]
                .into_iter()
                .chain(sources.iter().map(|(key, _)| *key))
                .collect::<Vec<_>>()
                .join(", ");
            [
                "<script lang=\"ts\">".to_string(),
                imports.join("\n"),
                format!("import Picture from {};", quote_single(component)),
                format!("const src = {{ {keys} }};"),
                "</script>".to_string(),
                "<Picture {src} {...$$restProps} />\n".to_string(),
            ]
            .join("\n")
        }
    }
}

/// Re-export of the original asset, used for derivative ids outside production.
pub fn passthrough_module(original: &str) -> String {
    format!("export {{ default }} from {};\n", quote(original))
}

/// Module exporting an emitted asset's URL.
pub fn asset_module(url_expr: &str) -> String {
    format!("export default {url_expr};\n")
}

fn import_default(binding: &str, id: &str) -> String {
    format!("import {binding} from {};", quote(id))
}

/// JavaScript string literal for `s`.
fn quote(s: &str) -> String {
    // JSON strings are valid JS string literals
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\""))
}

fn quote_single(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}
