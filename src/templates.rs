//! Sample label designs (JSON) for testing and demonstration.
//!
//! Each template exercises a different mix of element kinds. Templates with
//! `{{...}}` tokens pair with the sample records below.

/// 4×6 in shipping label: addresses, routing barcode, divider lines.
pub fn shipping_label_template() -> &'static str {
    r##"{
  "label": { "width_mm": 101.6, "height_mm": 152.4 },
  "reference_dpi": 203,
  "elements": [
    { "id": "frame", "type": "shape", "x": 8, "y": 8, "width": 796, "height": 1202,
      "properties": { "kind": "rectangle", "stroke": "#000000", "stroke_width": 4 } },
    { "id": "from", "type": "text", "x": 30, "y": 30, "width": 500, "height": 130,
      "properties": { "content": "FROM:\n{{sender_name}}\n{{sender_city}}", "font_size": 26 } },
    { "id": "divider-1", "type": "shape", "x": 8, "y": 180, "width": 796, "height": 4,
      "properties": { "kind": "line", "stroke_width": 4 } },
    { "id": "to-heading", "type": "text", "x": 30, "y": 210, "width": 300, "height": 40,
      "properties": { "content": "SHIP TO:", "font_size": 28, "bold": true } },
    { "id": "to", "type": "text", "x": 60, "y": 260, "width": 720, "height": 260,
      "properties": { "content": "{{recipient_name}}\n{{street}}\n{{city}}, {{state}} {{zip}}",
                      "font_size": 44, "line_height": 1.25 } },
    { "id": "divider-2", "type": "shape", "x": 8, "y": 560, "width": 796, "height": 4,
      "properties": { "kind": "line", "stroke_width": 4 } },
    { "id": "service", "type": "text", "x": 30, "y": 590, "width": 752, "height": 80,
      "properties": { "content": "PRIORITY", "font_size": 64, "bold": true, "align": "center" } },
    { "id": "route", "type": "barcode", "x": 60, "y": 700, "width": 692, "height": 260,
      "properties": { "symbology": "CODE128", "value": "RNO-PRI-0420", "font_size": 28 } },
    { "id": "tracking", "type": "text", "x": 30, "y": 1000, "width": 752, "height": 60,
      "properties": { "content": "TRACKING #: {{tracking}}", "font_family": "Courier", "font_size": 30 } },
    { "id": "weight", "type": "text", "x": 30, "y": 1100, "width": 752, "height": 60,
      "properties": { "content": "Weight: {{weight}} lb", "font_size": 30, "align": "right" } }
  ]
}"##
}

/// 2×1 in product label: name, price and an EAN-13.
///
/// Tokens are resolved in text content only, so the barcode value is fixed.
pub fn product_label_template() -> &'static str {
    r##"{
  "label": { "width_mm": 50.8, "height_mm": 25.4 },
  "reference_dpi": 203,
  "elements": [
    { "id": "name", "type": "text", "x": 10, "y": 8, "width": 386, "height": 34,
      "properties": { "content": "{{product_name}}", "font_size": 26, "bold": true } },
    { "id": "price", "type": "text", "x": 10, "y": 8, "width": 386, "height": 34,
      "properties": { "content": "{{price}}", "font_size": 26, "align": "right" } },
    { "id": "ean", "type": "barcode", "x": 40, "y": 50, "width": 326, "height": 140,
      "properties": { "symbology": "EAN13", "value": "4006381333931", "font_size": 18 } }
  ]
}"##
}

/// Asset tag: rotated side text, QR code and a filled band.
pub fn asset_tag_template() -> &'static str {
    r##"{
  "label": { "width_mm": 62, "height_mm": 29 },
  "reference_dpi": 300,
  "elements": [
    { "id": "band", "type": "shape", "x": 0, "y": 0, "width": 70, "height": 342, "z_index": -1,
      "properties": { "kind": "rectangle", "fill": "#1a365d", "fill_opacity": 1, "stroke_width": 0 } },
    { "id": "side", "type": "text", "x": -120, "y": 146, "width": 310, "height": 50, "rotation": 270,
      "properties": { "content": "PROPERTY OF", "font_size": 32, "color": "#ffffff", "align": "center" } },
    { "id": "qr", "type": "barcode", "x": 90, "y": 21, "width": 300, "height": 300,
      "properties": { "symbology": "QRCODE", "value": "https://assets.example.com/tags" } },
    { "id": "asset-id", "type": "text", "x": 410, "y": 60, "width": 310, "height": 70,
      "properties": { "content": "{{asset_id}}", "font_family": "Courier", "font_size": 54, "bold": true } },
    { "id": "owner", "type": "text", "x": 410, "y": 150, "width": 310, "height": 150,
      "properties": { "content": "{{department}}\n{{location}}", "font_size": 36 } }
  ]
}"##
}

/// Every element kind and most properties, with no tokens.
pub fn all_elements_template() -> &'static str {
    r##"{
  "label": { "width_mm": 101.6, "height_mm": 76.2 },
  "reference_dpi": 203,
  "elements": [
    { "id": "title", "type": "text", "x": 20, "y": 20, "width": 772, "height": 50,
      "properties": { "content": "All Elements", "font_size": 40, "bold": true, "underline": true } },
    { "id": "body", "type": "text", "x": 20, "y": 80, "width": 500, "height": 110,
      "properties": { "content": "Justified text spreads across the box\nlast line stays left",
                      "font_family": "Times", "italic": true, "align": "justify", "color": "#333333" } },
    { "id": "logo", "type": "image", "x": 560, "y": 80, "width": 200, "height": 110, "opacity": 0.5,
      "properties": { "src": "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==",
                      "fit": "contain" } },
    { "id": "code39", "type": "barcode", "x": 20, "y": 210, "width": 360, "height": 120,
      "properties": { "symbology": "CODE39", "value": "LF-39" } },
    { "id": "ean8", "type": "barcode", "x": 420, "y": 210, "width": 240, "height": 120,
      "properties": { "symbology": "EAN8", "value": "9638507" } },
    { "id": "upce", "type": "barcode", "x": 20, "y": 350, "width": 200, "height": 120,
      "properties": { "symbology": "UPC-E", "value": "0425261" } },
    { "id": "aztec", "type": "barcode", "x": 260, "y": 350, "width": 120, "height": 120,
      "properties": { "symbology": "AZTEC", "value": "label-forge" } },
    { "id": "badge", "type": "shape", "x": 420, "y": 350, "width": 120, "height": 120, "rotation": 45,
      "properties": { "kind": "rectangle", "fill": "#e53e3e", "fill_opacity": 0.6, "stroke": "#742a2a", "stroke_width": 3 } },
    { "id": "dot", "type": "shape", "x": 580, "y": 350, "width": 120, "height": 120,
      "properties": { "kind": "circle", "fill": "#38a169", "fill_opacity": 1, "stroke_width": 0 } },
    { "id": "draft", "type": "text", "x": 20, "y": 480, "width": 200, "height": 40, "visible": false,
      "properties": { "content": "DRAFT" } }
  ]
}"##
}

/// Minimal design: one text element.
pub fn minimal_template() -> &'static str {
    r##"{"label": {"width_mm": 50.8, "height_mm": 25.4}, "elements": [
  {"id": "hello", "type": "text", "x": 10, "y": 10, "width": 380, "height": 60,
   "properties": {"content": "Hello, label!"}}
]}"##
}

/// Records for [`shipping_label_template`].
pub fn shipping_records() -> &'static str {
    r##"[
  { "sender_name": "Acme Fulfilment", "sender_city": "Reno, NV",
    "recipient_name": "Ada Lovelace", "street": "12 Analytical Way", "city": "London",
    "state": "UK", "zip": "N1 9GU", "tracking": "1Z999AA10123456784", "weight": 2.4 },
  { "sender_name": "Acme Fulfilment", "sender_city": "Reno, NV",
    "recipient_name": "Grace Hopper", "street": "1 Compiler Ct", "city": "Arlington",
    "state": "VA", "zip": "22202", "tracking": "1Z999AA10123456785", "weight": 11 },
  { "sender_name": "Acme Fulfilment", "sender_city": "Reno, NV",
    "recipient_name": "Alan Turing", "street": "7 Bletchley Rd", "city": "Milton Keynes",
    "state": "UK", "zip": "MK3 6EB", "tracking": "", "weight": 0.8 }
]"##
}

/// Records for [`product_label_template`], keyed by spreadsheet column
/// names. Use with [`product_column_mapping`].
pub fn product_records() -> &'static str {
    r##"[
  { "Product Name": "Widget", "Price": "$4.99" },
  { "Product Name": "Gadget", "Price": "$12.50" },
  { "Product Name": "Gizmo", "Price": 7.25 }
]"##
}

/// Column → field mapping for [`product_records`].
pub fn product_column_mapping() -> &'static str {
    r##"{ "Product Name": "product_name", "Price": "price" }"##
}
