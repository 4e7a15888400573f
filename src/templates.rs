//! HTML templates for the print backend and the placeholder filler.
//!
//! Placeholders are written `{{name}}`. Lengths in the stylesheets are in
//! points so the in-process layout engine and Chromium agree on geometry.

/// The data sheet body. Placeholders: `productName`, `logoImage`, `title`,
/// `code`, `powerSupply`, `productImage`, `sectionsHtml`.
pub fn datasheet_template() -> &'static str {
    r##"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Product data sheet</title>
<style>
  body { font-family: Helvetica, Arial, sans-serif; font-size: 10pt; color: #000000; margin: 0; }
  .header { display: flex; justify-content: space-between; align-items: center; margin-bottom: 12pt; }
  .product-name { font-size: 14pt; font-weight: bold; color: #c91e42; }
  .logo-container { width: 80pt; text-align: right; }
  .logo { max-width: 80pt; max-height: 30pt; }
  .title-block { margin-bottom: 10pt; }
  .title { font-size: 14pt; font-weight: bold; margin-bottom: 4pt; }
  .code, .power-supply { font-size: 10pt; text-align: right; }
  .product-image-container { float: right; text-align: right; margin: 0 0 8pt 10pt; }
  .product-image { max-width: 150pt; max-height: 150pt; }
  .content-section { margin-bottom: 10pt; }
  .subtitle { font-size: 11pt; font-weight: bold; margin-bottom: 4pt; }
  ul.features-list { margin: 0; padding-left: 20pt; }
  .features-list li { margin-bottom: 2pt; }
  table.invisible { width: 100%; }
  table.invisible td { padding: 2pt 5pt; text-align: left; }
  table.zebra { width: 100%; font-size: 8pt; }
  table.zebra th, table.zebra td { padding: 3pt 5pt; text-align: center; }
  table.zebra th { font-weight: bold; }
  table.zebra .shade { background-color: #e2e2e2; }
  table.zebra thead tr { border-top: 1pt solid #000000; border-bottom: 2pt solid #000000; }
  table.zebra tr.last-row { border-bottom: 1pt solid #000000; }
</style>
</head>
<body>
  <div class="header">
    <div class="product-name">{{productName}}</div>
    <div class="logo-container">{{logoImage}}</div>
  </div>
  <div class="title-block">
    <div class="title">{{title}}</div>
    <div class="code">{{code}}</div>
    <div class="power-supply">{{powerSupply}}</div>
  </div>
  {{productImage}}
  {{sectionsHtml}}
</body>
</html>
"##
}

/// The per-page footer. Placeholders: `footerText`, `versionDate`,
/// `disclaimer`. The `pageNumber` and `totalPages` spans are filled in by
/// the print engine.
pub fn footer_template() -> &'static str {
    r##"<style>
  .footer { font-size: 8pt; width: 100%; }
  .footer-row { display: flex; justify-content: space-between; }
  .version { text-align: right; }
  .disclaimer { font-size: 7pt; color: #555555; margin-top: 2pt; }
</style>
<div class="footer">
  <div class="footer-row">
    <span class="footer-text">{{footerText}}</span>
    <span class="version">Version: {{versionDate}}&nbsp;&nbsp;&nbsp; Page <span class="pageNumber"></span> of <span class="totalPages"></span></span>
  </div>
  <div class="disclaimer">{{disclaimer}}</div>
</div>
"##
}

/// Replace `{{name}}` placeholders in one left-to-right pass.
///
/// Inserted values are never scanned again, so a value that itself contains
/// `{{...}}` is kept literally. Unknown placeholders are left untouched.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let Some(close) = after.find("}}") else {
            out.push_str(&rest[open..]);
            return out;
        };
        let name = &after[..close];
        match values.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => out.push_str(value),
            None => {
                out.push_str("{{");
                out.push_str(name);
                out.push_str("}}");
            }
        }
        rest = &after[close + 2..];
    }
    out.push_str(rest);
    out
}
