//! Carte HTML interactive (Leaflet) avec une couche GeoJSON et des tooltips

use std::fmt::Write as _;
use std::path::Path;

use geotable::{Epsg, FeatureCollection, Value};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value as JsonValue};
use tracing::{debug, info};

use crate::error::{EtlError, Result};

const LEAFLET_VERSION: &str = "1.9.4";

/// Membre GeoJSON (hors `properties`) portant le HTML du tooltip, pour ne
/// masquer aucun attribut
pub const TOOLTIP_MEMBER: &str = "tooltip";

/// Options de rendu de la carte
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapOptions {
    /// Centre initial `[lat, lon]`
    pub center: [f64; 2],
    pub zoom: u8,
    /// Nom de la couche GeoJSON dans le contrôle des couches
    pub layer_name: String,
    /// Champs affichés au survol, dans l'ordre
    pub tooltip_fields: Vec<String>,
    pub tile_url: String,
    pub attribution: String,
    pub title: String,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            center: [32.65, -16.9],
            zoom: 12,
            layer_name: "Properties".into(),
            tooltip_fields: Vec::new(),
            tile_url: "https://tile.openstreetmap.org/{z}/{x}/{y}.png".into(),
            attribution: "&copy; OpenStreetMap contributors".into(),
            title: "Properties".into(),
        }
    }
}

/// Échappe une chaîne pour du HTML
pub fn escape_html(text: &str) -> String {
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

/// JSON à inclure dans un `<script>`: aucun `<` brut
fn script_json(json: &str) -> String {
    json.replace('<', "\\u003c")
}

fn to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Integer(i) => JsonValue::Number(Number::from(*i)),
        Value::Float(v) => Number::from_f64(*v)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Value::Text(s) => JsonValue::String(s.clone()),
    }
}

fn tooltip_html(fields: &[(usize, &str)], values: &[Value]) -> String {
    let mut html = String::new();
    for (idx, name) in fields {
        let _ = write!(
            html,
            "<div><strong>{}</strong>: {}</div>",
            escape_html(name),
            escape_html(&values[*idx].to_string())
        );
    }
    html
}

/// Construit la couche GeoJSON (WGS84) avec le tooltip de chaque enregistrement
fn to_geojson(collection: &FeatureCollection, tooltip: &[(usize, &str)]) -> geojson::FeatureCollection {
    let schema = collection.schema();
    let features = collection
        .features()
        .iter()
        .filter_map(|feature| {
            let geometry = feature.geometry.as_ref()?;

            let properties: Map<String, JsonValue> = schema
                .fields
                .iter()
                .zip(&feature.values)
                .map(|(field, value)| (field.name.clone(), to_json(value)))
                .collect();
            let mut members = Map::new();
            members.insert(
                TOOLTIP_MEMBER.to_string(),
                JsonValue::String(tooltip_html(tooltip, &feature.values)),
            );

            Some(geojson::Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(geojson::Value::from(geometry))),
                id: None,
                properties: Some(properties),
                foreign_members: Some(members),
            })
        })
        .collect();

    geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Rend la carte HTML d'une collection en WGS84.
///
/// Les enregistrements sans géométrie ne sont pas affichés.
///
/// # Errors
///
/// `Render` si la collection n'est pas en EPSG:4326 ou si un champ de tooltip
/// n'existe pas.
pub fn render_map(collection: &FeatureCollection, options: &MapOptions) -> Result<String> {
    if collection.crs() != Some(Epsg::WGS84) {
        return Err(EtlError::Render(format!(
            "map layers must be in {}, collection is in {}",
            Epsg::WGS84,
            collection
                .crs()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "an undefined CRS".into())
        )));
    }

    let tooltip = options
        .tooltip_fields
        .iter()
        .map(|name| {
            collection
                .schema()
                .index_of(name)
                .map(|idx| (idx, name.as_str()))
                .ok_or_else(|| EtlError::Render(format!("tooltip field '{}' not found", name)))
        })
        .collect::<Result<Vec<_>>>()?;

    let layer = to_geojson(collection, &tooltip);
    let omitted = collection.len() - layer.features.len();
    if omitted > 0 {
        debug!(omitted, "Records without geometry left out of the map");
    }

    let json_string = |s: &str| {
        serde_json::to_string(s)
            .map(|j| script_json(&j))
            .map_err(|e| EtlError::Render(e.to_string()))
    };

    let mut html = String::with_capacity(4096 + collection.len() * 256);
    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8" />
<meta name="viewport" content="width=device-width, initial-scale=1.0" />
<title>{title}</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@{leaflet}/dist/leaflet.css" />
<script src="https://unpkg.com/leaflet@{leaflet}/dist/leaflet.js"></script>
<style>
html, body {{ width: 100%; height: 100%; margin: 0; padding: 0; }}
#map {{ position: absolute; top: 0; bottom: 0; right: 0; left: 0; }}
</style>
</head>
<body>
<div class="leaflet-map" id="map"></div>
<script>
var map = L.map("map").setView([{lat}, {lon}], {zoom});
L.tileLayer({tile_url}, {{ attribution: {attribution}, maxZoom: 19 }}).addTo(map);
var data = {data};
var layer = L.geoJSON(data, {{
  onEachFeature: function (feature, featureLayer) {{
    featureLayer.bindTooltip(feature.{tooltip_member}, {{ sticky: true }});
  }}
}}).addTo(map);
var overlays = {{}};
overlays[{layer_name}] = layer;
L.control.layers(null, overlays).addTo(map);
</script>
</body>
</html>
"#,
        title = escape_html(&options.title),
        leaflet = LEAFLET_VERSION,
        lat = options.center[0],
        lon = options.center[1],
        zoom = options.zoom,
        tile_url = json_string(&options.tile_url)?,
        attribution = json_string(&options.attribution)?,
        data = script_json(&layer.to_string()),
        tooltip_member = TOOLTIP_MEMBER,
        layer_name = json_string(&options.layer_name)?,
    );

    Ok(html)
}

/// Rend la carte et l'écrit dans `path`
pub fn write_map(path: &Path, collection: &FeatureCollection, options: &MapOptions) -> Result<()> {
    let html = render_map(collection, options)?;
    std::fs::write(path, html)
        .map_err(|e| EtlError::Write(format!("{}: {}", path.display(), e)))?;

    info!(path = %path.display(), features = collection.len(), "Wrote map");
    Ok(())
}
