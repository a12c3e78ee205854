//! Wavefront MTL material libraries
//!
//! Parses `.mtl` files into named Phong materials. Texture maps referenced by
//! a material are loaded through the content provider as [`Texture`]s, so
//! they are shared with every other user of the same image and show up in
//! the library's dependency set. Map paths are relative to the content root.

use std::collections::BTreeMap;
use std::io::Read;

use super::text::read_utf8;
use super::texture::Texture;
use crate::content::error::ContentError;
use crate::content::key::{Content, ContentRef};
use crate::content::provider::ContentProvider;
use crate::content::reader::{ContentReader, InPlaceReader};
use crate::foundation::math::Vec3;

/// Texture map slots understood by the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TextureSlot {
    /// `map_Kd`
    Diffuse,
    /// `map_Ks`
    Specular,
    /// `map_Bump` / `bump`
    Normal,
    /// `map_Ke`
    Emission,
    /// `map_Ka`
    AmbientOcclusion,
}

/// Parsed MTL material data (Wavefront Phong model)
#[derive(Debug, Clone)]
pub struct MtlData {
    /// Material name
    pub name: String,
    /// Ambient color (Ka)
    pub ambient: Vec3,
    /// Diffuse color (Kd)
    pub diffuse: Vec3,
    /// Specular color (Ks)
    pub specular: Vec3,
    /// Emission color (Ke)
    pub emission: Vec3,
    /// Specular exponent (Ns), 0 to 1000
    pub specular_exponent: f32,
    /// Opacity (d); 0.0 is transparent
    pub dissolve: f32,
    /// Illumination model (illum)
    pub illumination_model: u32,
    /// Texture map paths by slot
    pub maps: BTreeMap<TextureSlot, String>,
}

impl Default for MtlData {
    fn default() -> Self {
        Self {
            name: String::new(),
            ambient: Vec3::new(1.0, 1.0, 1.0),
            diffuse: Vec3::new(0.8, 0.8, 0.8),
            specular: Vec3::new(0.5, 0.5, 0.5),
            emission: Vec3::new(0.0, 0.0, 0.0),
            specular_exponent: 250.0,
            dissolve: 1.0,
            illumination_model: 2,
            maps: BTreeMap::new(),
        }
    }
}

/// MTL file parser
pub struct MtlParser;

impl MtlParser {
    /// Parse MTL file contents into materials keyed by name
    pub fn parse(contents: &str) -> Result<BTreeMap<String, MtlData>, ContentError> {
        let mut materials = BTreeMap::new();
        let mut current: Option<MtlData> = None;

        for (line_num, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut tokens = line.split_whitespace();
            let Some(command) = tokens.next() else {
                continue;
            };

            if command == "newmtl" {
                if let Some(mat) = current.take() {
                    materials.insert(mat.name.clone(), mat);
                }
                let name = tokens
                    .next()
                    .ok_or_else(|| parse_error(line_num, "newmtl missing material name"))?;
                current = Some(MtlData {
                    name: name.to_string(),
                    ..MtlData::default()
                });
                continue;
            }

            // Statements before the first newmtl have nothing to apply to
            let Some(mat) = current.as_mut() else {
                continue;
            };

            match command {
                "Ka" => mat.ambient = parse_vec3(&mut tokens, line_num, command)?,
                "Kd" => mat.diffuse = parse_vec3(&mut tokens, line_num, command)?,
                "Ks" => mat.specular = parse_vec3(&mut tokens, line_num, command)?,
                "Ke" => mat.emission = parse_vec3(&mut tokens, line_num, command)?,
                "Ns" => mat.specular_exponent = parse_number(&mut tokens, line_num, command)?,
                "d" => mat.dissolve = parse_number(&mut tokens, line_num, command)?,
                "Tr" => mat.dissolve = 1.0 - parse_number::<f32>(&mut tokens, line_num, command)?,
                "illum" => mat.illumination_model = parse_number(&mut tokens, line_num, command)?,
                _ => {
                    if let Some(slot) = map_slot(command) {
                        let path = parse_texture_path(&mut tokens, line_num, command)?;
                        mat.maps.insert(slot, path);
                    }
                }
            }
        }

        if let Some(mat) = current {
            materials.insert(mat.name.clone(), mat);
        }

        Ok(materials)
    }
}

fn map_slot(command: &str) -> Option<TextureSlot> {
    match command {
        "map_Kd" => Some(TextureSlot::Diffuse),
        "map_Ks" => Some(TextureSlot::Specular),
        "map_Bump" | "bump" => Some(TextureSlot::Normal),
        "map_Ke" => Some(TextureSlot::Emission),
        "map_Ka" => Some(TextureSlot::AmbientOcclusion),
        _ => None,
    }
}

fn parse_error(line_num: usize, message: impl std::fmt::Display) -> ContentError {
    ContentError::invalid_data(format!("Line {}: {}", line_num + 1, message))
}

fn parse_vec3<'a>(tokens: &mut impl Iterator<Item = &'a str>, line_num: usize, command: &str) -> Result<Vec3, ContentError> {
    let r = parse_number(tokens, line_num, command)?;
    let g = parse_number(tokens, line_num, command)?;
    let b = parse_number(tokens, line_num, command)?;
    Ok(Vec3::new(r, g, b))
}

fn parse_number<'a, N: std::str::FromStr>(
    tokens: &mut impl Iterator<Item = &'a str>,
    line_num: usize,
    command: &str,
) -> Result<N, ContentError> {
    let token = tokens
        .next()
        .ok_or_else(|| parse_error(line_num, format!("{} missing value", command)))?;
    token
        .parse::<N>()
        .map_err(|_| parse_error(line_num, format!("{} invalid value '{}'", command, token)))
}

/// Texture paths may contain spaces; take the rest of the line
fn parse_texture_path<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    line_num: usize,
    command: &str,
) -> Result<String, ContentError> {
    let path: Vec<&str> = tokens.collect();
    if path.is_empty() {
        return Err(parse_error(line_num, format!("{} missing texture path", command)));
    }
    Ok(path.join(" "))
}

/// Material with its texture maps resolved
#[derive(Debug, Clone)]
pub struct Material {
    /// Ambient color
    pub ambient: Vec3,
    /// Diffuse color
    pub diffuse: Vec3,
    /// Specular color
    pub specular: Vec3,
    /// Emission color
    pub emission: Vec3,
    /// Specular exponent
    pub specular_exponent: f32,
    /// Opacity
    pub dissolve: f32,
    /// Illumination model
    pub illumination_model: u32,
    textures: BTreeMap<TextureSlot, ContentRef<Texture>>,
}

impl Material {
    /// Texture bound to `slot`, if any
    pub fn texture(&self, slot: TextureSlot) -> Option<&ContentRef<Texture>> {
        self.textures.get(&slot)
    }

    /// Number of bound textures
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }
}

/// All materials of one MTL file
#[derive(Debug, Clone, Default)]
pub struct MaterialLibrary {
    materials: BTreeMap<String, Material>,
}

impl MaterialLibrary {
    /// Material by name
    pub fn get(&self, name: &str) -> Option<&Material> {
        self.materials.get(name)
    }

    /// Material names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.materials.keys().map(String::as_str)
    }

    /// Number of materials
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    /// Whether the library is empty
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

impl Content for MaterialLibrary {}

/// Reads [`MaterialLibrary`] files; re-reads in place
#[derive(Debug, Clone, Copy, Default)]
pub struct MaterialReader;

impl MaterialReader {
    fn build(&self, stream: &mut dyn Read, provider: &mut dyn ContentProvider) -> Result<MaterialLibrary, ContentError> {
        let parsed = MtlParser::parse(&read_utf8(stream)?)?;

        let mut materials = BTreeMap::new();
        for (name, data) in parsed {
            let mut textures = BTreeMap::new();
            for (slot, path) in &data.maps {
                textures.insert(*slot, provider.load::<Texture>(path)?);
            }

            materials.insert(
                name,
                Material {
                    ambient: data.ambient,
                    diffuse: data.diffuse,
                    specular: data.specular,
                    emission: data.emission,
                    specular_exponent: data.specular_exponent,
                    dissolve: data.dissolve,
                    illumination_model: data.illumination_model,
                    textures,
                },
            );
        }

        Ok(MaterialLibrary { materials })
    }
}

impl ContentReader<MaterialLibrary> for MaterialReader {
    fn read(&self, stream: &mut dyn Read, provider: &mut dyn ContentProvider) -> Result<MaterialLibrary, ContentError> {
        self.build(stream, provider)
    }

    fn in_place(&self) -> Option<&dyn InPlaceReader<MaterialLibrary>> {
        Some(self)
    }
}

impl InPlaceReader<MaterialLibrary> for MaterialReader {
    fn read_into(
        &self,
        existing: &mut MaterialLibrary,
        stream: &mut dyn Read,
        provider: &mut dyn ContentProvider,
    ) -> Result<(), ContentError> {
        *existing = self.build(stream, provider)?;
        Ok(())
    }
}
