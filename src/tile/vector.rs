use crate::tile::pbf::{PbfError, PbfReader, PbfWriter, WireType, zigzag_decode, zigzag_encode};

/// Default layer extent in tile units.
pub const DEFAULT_EXTENT: u32 = 4096;

const CMD_MOVE_TO: u32 = 1;
const CMD_LINE_TO: u32 = 2;
const CMD_CLOSE_PATH: u32 = 7;

/// Why a vector tile could not be decoded. Displays the low-level reason only; callers add
/// the tile address.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TileError {
    /// Wire-level failure.
    #[error(transparent)]
    Pbf(#[from] PbfError),
    /// Geometry command stream is malformed.
    #[error("invalid geometry: {0}")]
    Geometry(String),
    /// Layer declares a version this decoder does not know.
    #[error("unsupported vector tile version {0}")]
    Version(u32),
}

/// Geometry type of a feature.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GeomType {
    /// Unspecified.
    #[default]
    Unknown,
    /// Points.
    Point,
    /// Line strings.
    LineString,
    /// Polygons (outer and inner rings).
    Polygon,
}

impl GeomType {
    fn from_wire(v: u32) -> Self {
        match v {
            1 => Self::Point,
            2 => Self::LineString,
            3 => Self::Polygon,
            _ => Self::Unknown,
        }
    }

    fn to_wire(self) -> u64 {
        match self {
            Self::Unknown => 0,
            Self::Point => 1,
            Self::LineString => 2,
            Self::Polygon => 3,
        }
    }
}

/// One feature: its paths in layer coordinates. Polygon rings are not closed explicitly.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Feature {
    /// Optional feature id.
    pub id: Option<u64>,
    /// Geometry type.
    pub kind: GeomType,
    /// Paths, one per `MoveTo`.
    pub rings: Vec<Vec<(i32, i32)>>,
}

/// Named collection of features.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VectorLayer {
    /// Layer name, matched against `source-layer`.
    pub name: String,
    /// Coordinate extent of the tile square.
    pub extent: u32,
    /// Features in encounter order.
    pub features: Vec<Feature>,
}

/// Decoded Mapbox Vector Tile.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VectorTile {
    /// Layers in encounter order.
    pub layers: Vec<VectorLayer>,
}

impl VectorTile {
    /// Decode a tile from uncompressed protobuf bytes.
    pub fn decode(data: &[u8]) -> Result<Self, TileError> {
        let mut r = PbfReader::new(data);
        let mut layers = Vec::new();
        while let Some((field, _)) = r.next_field()? {
            match field {
                3 => layers.push(decode_layer(r.read_message()?)?),
                _ => r.skip()?,
            }
        }
        Ok(Self { layers })
    }

    /// Find a layer by name.
    pub fn layer(&self, name: &str) -> Option<&VectorLayer> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// Encode as protobuf bytes (version 2 layers).
    pub fn encode(&self) -> Vec<u8> {
        let mut tile = PbfWriter::new();
        for layer in &self.layers {
            let mut lw = PbfWriter::new();
            lw.varint(15, 2).bytes(1, layer.name.as_bytes());
            for feature in &layer.features {
                let mut fw = PbfWriter::new();
                if let Some(id) = feature.id {
                    fw.varint(1, id);
                }
                fw.varint(3, feature.kind.to_wire());
                fw.packed_u32(4, &encode_geometry(feature));
                lw.bytes(2, &fw.finish());
            }
            lw.varint(5, u64::from(layer.extent));
            tile.bytes(3, &lw.finish());
        }
        tile.finish()
    }
}

fn decode_layer(mut r: PbfReader<'_>) -> Result<VectorLayer, TileError> {
    let mut name = String::new();
    let mut extent = DEFAULT_EXTENT;
    let mut version = 1;
    let mut features = Vec::new();
    while let Some((field, _)) = r.next_field()? {
        match field {
            15 => version = r.read_u32()?,
            1 => name = r.read_string()?.to_owned(),
            2 => features.push(decode_feature(r.read_message()?)?),
            5 => extent = r.read_u32()?,
            _ => r.skip()?,
        }
    }
    if !(1..=2).contains(&version) {
        return Err(TileError::Version(version));
    }
    Ok(VectorLayer {
        name,
        extent,
        features,
    })
}

fn decode_feature(mut r: PbfReader<'_>) -> Result<Feature, TileError> {
    let mut feature = Feature::default();
    while let Some((field, wire)) = r.next_field()? {
        match field {
            1 => feature.id = Some(r.read_u64()?),
            3 => feature.kind = GeomType::from_wire(r.read_u32()?),
            4 if wire == WireType::Bytes => {
                feature.rings = decode_geometry(&r.read_packed_u32()?)?;
            }
            _ => r.skip()?,
        }
    }
    Ok(feature)
}

fn decode_geometry(cmds: &[u32]) -> Result<Vec<Vec<(i32, i32)>>, TileError> {
    let mut rings: Vec<Vec<(i32, i32)>> = Vec::new();
    let (mut x, mut y) = (0i32, 0i32);
    let mut i = 0;
    while i < cmds.len() {
        let cmd = cmds[i] & 0x7;
        let count = (cmds[i] >> 3) as usize;
        i += 1;
        match cmd {
            CMD_MOVE_TO | CMD_LINE_TO => {
                if cmds.len() - i < count * 2 {
                    return Err(TileError::Geometry(format!(
                        "command {cmd} wants {count} points past end of stream"
                    )));
                }
                for _ in 0..count {
                    x = x.wrapping_add(zigzag_decode(cmds[i]));
                    y = y.wrapping_add(zigzag_decode(cmds[i + 1]));
                    i += 2;
                    if cmd == CMD_MOVE_TO {
                        rings.push(vec![(x, y)]);
                    } else {
                        rings
                            .last_mut()
                            .ok_or_else(|| {
                                TileError::Geometry("LineTo before MoveTo".to_owned())
                            })?
                            .push((x, y));
                    }
                }
            }
            CMD_CLOSE_PATH => {
                if rings.is_empty() {
                    return Err(TileError::Geometry("ClosePath before MoveTo".to_owned()));
                }
            }
            other => {
                return Err(TileError::Geometry(format!("unknown command {other}")));
            }
        }
    }
    Ok(rings)
}

fn encode_geometry(feature: &Feature) -> Vec<u32> {
    let command = |id: u32, count: usize| (id & 0x7) | ((count as u32) << 3);
    let mut out = Vec::new();
    let (mut cx, mut cy) = (0i32, 0i32);
    for ring in &feature.rings {
        let Some((first, rest)) = ring.split_first() else {
            continue;
        };
        out.push(command(CMD_MOVE_TO, 1));
        out.push(zigzag_encode(first.0 - cx));
        out.push(zigzag_encode(first.1 - cy));
        (cx, cy) = *first;
        if !rest.is_empty() {
            out.push(command(CMD_LINE_TO, rest.len()));
            for &(x, y) in rest {
                out.push(zigzag_encode(x - cx));
                out.push(zigzag_encode(y - cy));
                (cx, cy) = (x, y);
            }
        }
        if feature.kind == GeomType::Polygon {
            out.push(command(CMD_CLOSE_PATH, 1));
        }
    }
    out
}

/// Fluent builder for test and fixture tiles.
#[derive(Clone, Debug, Default)]
pub struct TileBuilder {
    tile: VectorTile,
}

impl TileBuilder {
    /// Empty tile.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new layer; later features go into it.
    pub fn layer(mut self, name: &str) -> Self {
        self.tile.layers.push(VectorLayer {
            name: name.to_owned(),
            extent: DEFAULT_EXTENT,
            features: Vec::new(),
        });
        self
    }

    /// Override the current layer's extent.
    pub fn extent(mut self, extent: u32) -> Self {
        if let Some(layer) = self.tile.layers.last_mut() {
            layer.extent = extent;
        }
        self
    }

    /// Add a polygon feature to the current layer, starting a `default` layer if none exists.
    pub fn polygon(mut self, rings: Vec<Vec<(i32, i32)>>) -> Self {
        if self.tile.layers.is_empty() {
            self = self.layer("default");
        }
        if let Some(layer) = self.tile.layers.last_mut() {
            let id = layer.features.len() as u64 + 1;
            layer.features.push(Feature {
                id: Some(id),
                kind: GeomType::Polygon,
                rings,
            });
        }
        self
    }

    /// Finished tile.
    pub fn build(self) -> VectorTile {
        self.tile
    }

    /// Finished tile as protobuf bytes.
    pub fn encode(self) -> Vec<u8> {
        self.tile.encode()
    }
}

/// Axis-aligned rectangle ring, handy for fixtures.
pub fn rect_ring(x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<(i32, i32)> {
    vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1)]
}

#[cfg(test)]
#[path = "../../tests/unit/tile/vector.rs"]
mod tests;
