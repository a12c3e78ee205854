//! Built-in content readers

pub mod material;
pub mod shader;
pub mod text;
pub mod texture;

pub use material::{Material, MaterialLibrary, MaterialReader, MtlData, MtlParser, TextureSlot};
pub use shader::{ShaderInclude, ShaderIncludeReader, ShaderSource, ShaderSourceReader};
pub use text::{Text, TextReader};
pub use texture::{live_textures, ImageData, Texture, TextureId, TextureReader};

use super::reader::ReaderRegistry;

/// Register every built-in reader with `registry`
pub fn register_builtin(registry: &mut ReaderRegistry) {
    registry.set_reader::<Text, _>(TextReader);
    registry.set_reader::<ShaderSource, _>(ShaderSourceReader);
    registry.set_reader::<ShaderInclude, _>(ShaderIncludeReader);
    registry.set_reader::<Texture, _>(TextureReader);
    registry.set_reader::<MaterialLibrary, _>(MaterialReader);
}
