use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use glam::{Vec3, Vec4};
use roxmltree::{Document, Node};

use crate::camera::{Camera, DEFAULT_FIELD_OF_VIEW};
use crate::config::RendererConfig;
use crate::light::Light;
use crate::mesh::MeshDescriptor;
use crate::render::{RenderBackend, RenderController};
use crate::shapes::ShapeKind;

const DEFAULT_CYLINDER_SIDES: u32 = 32;
const DEFAULT_SPHERE_SLICES: u32 = 32;
const DEFAULT_SPHERE_STACKS: u32 = 16;

/// Everything needed to populate a renderer: window settings, the camera
/// start pose, lights and meshes in render order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SceneDescription {
    pub config: RendererConfig,
    pub camera: CameraSpec,
    pub lights: Vec<Light>,
    pub meshes: Vec<MeshSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSpec {
    pub position: Vec3,
    pub fov: f32,
}

impl Default for CameraSpec {
    fn default() -> Self {
        Self {
            position: default_camera_position(),
            fov: default_fov(),
        }
    }
}

impl CameraSpec {
    pub fn build(&self) -> Camera {
        let mut camera = Camera::new();
        camera.set_position(self.position.x, self.position.y, self.position.z);
        camera.set_field_of_view(self.fov);
        camera
    }
}

/// Rotation as an angle in degrees about an axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisAngle {
    pub degrees: f32,
    pub axis: Vec3,
}

impl Default for AxisAngle {
    fn default() -> Self {
        Self {
            degrees: 0.0,
            axis: Vec3::Y,
        }
    }
}

/// One mesh as described in a scene file.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshSpec {
    pub name: String,
    pub shape: ShapeKind,
    pub scale: Vec3,
    pub rotation: AxisAngle,
    pub translation: Vec3,
    pub texture: Option<PathBuf>,
    pub shininess: f32,
    pub color: Option<Vec4>,
}

impl MeshSpec {
    pub fn new(name: &str, shape: ShapeKind) -> Self {
        Self {
            name: name.to_string(),
            shape,
            scale: default_scale(),
            rotation: AxisAngle::default(),
            translation: Vec3::ZERO,
            texture: None,
            shininess: 0.0,
            color: None,
        }
    }

    /// Generates the geometry and applies the transform and material.
    pub fn build(&self) -> MeshDescriptor {
        let mut mesh = self.shape.build();
        mesh.set_scale(self.scale.x, self.scale.y, self.scale.z)
            .set_rotation(self.rotation.degrees, self.rotation.axis)
            .set_translation(self.translation.x, self.translation.y, self.translation.z)
            .set_shininess(self.shininess);
        if let Some(color) = self.color {
            mesh.set_color(color);
        }
        if let Some(texture) = &self.texture {
            mesh.set_texture(texture);
        }
        mesh
    }
}

fn default_camera_position() -> Vec3 {
    Vec3::new(0.0, 1.5, 5.0)
}

fn default_fov() -> f32 {
    DEFAULT_FIELD_OF_VIEW
}

fn default_scale() -> Vec3 {
    Vec3::ONE
}

impl SceneDescription {
    /// Reads a scene file. Relative texture paths resolve against the
    /// directory containing the file.
    pub fn load(path: &Path) -> Result<Self> {
        let xml = fs::read_to_string(path)
            .with_context(|| format!("failed to read scene {}", path.display()))?;
        let mut scene = Self::from_xml(&xml)
            .with_context(|| format!("failed to parse scene {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        for mesh in &mut scene.meshes {
            if let Some(texture) = mesh.texture.as_mut() {
                if texture.is_relative() {
                    *texture = base.join(&*texture);
                }
            }
        }
        Ok(scene)
    }

    /// Parses the scene XML format.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid scene XML")?;
        let root = document.root_element();
        if !root.has_tag_name("scene") {
            bail!("expected <scene> root element, found <{}>", root.tag_name().name());
        }

        let mut scene = Self::default();
        if let Some(window) = child(&root, "window") {
            let config = &mut scene.config;
            config.width = parse_u32(optional_text(&window, "width"), config.width)?;
            config.height = parse_u32(optional_text(&window, "height"), config.height)?;
            if let Some(title) = optional_text(&window, "title") {
                config.title = title;
            }
            config.clear_color = parse_color(optional_text(&window, "clear"), config.clear_color)?;
        }

        if let Some(camera) = child(&root, "camera") {
            let spec = &mut scene.camera;
            spec.position = parse_vec3(optional_text(&camera, "position"), spec.position)?;
            spec.fov = parse_f32(optional_text(&camera, "fov"), spec.fov)?;
        }

        for node in root.children().filter(|n| n.has_tag_name("light")) {
            let position = parse_vec3(optional_text(&node, "position"), Vec3::ZERO)?;
            let color = parse_color(optional_text(&node, "color"), Vec4::ONE)?;
            let intensity = parse_f32(optional_text(&node, "intensity"), 1.0)?;
            scene
                .lights
                .push(Light::new(position, color.truncate(), intensity));
        }

        for node in root.children().filter(|n| n.has_tag_name("mesh")) {
            let name = required_text(&node, "name")?;
            let shape = parse_shape(&node).with_context(|| format!("mesh {name}"))?;
            let mut spec = MeshSpec::new(&name, shape);
            spec.scale = parse_vec3(optional_text(&node, "scale"), spec.scale)?;
            spec.rotation = parse_rotation(optional_text(&node, "rotation"), spec.rotation)?;
            spec.translation = parse_vec3(optional_text(&node, "translation"), spec.translation)?;
            spec.texture = optional_text(&node, "texture").map(PathBuf::from);
            spec.shininess = parse_f32(optional_text(&node, "shininess"), spec.shininess)?;
            spec.color = optional_text(&node, "color")
                .map(|value| parse_color(Some(value), Vec4::ONE))
                .transpose()?;
            scene.meshes.push(spec);
        }

        Ok(scene)
    }

    /// Built-in scene used when no file is given: two stacked card boxes on
    /// a ground plane, lit by two lights.
    pub fn default_scene() -> Self {
        let mut bottom = MeshSpec::new("bottom-cards", ShapeKind::Cube);
        bottom.scale = Vec3::new(1.6, 0.5, 1.4);
        bottom.rotation = AxisAngle {
            degrees: 45.0,
            axis: Vec3::Y,
        };
        bottom.translation = Vec3::new(-2.0, 0.0, 0.0);
        bottom.shininess = 0.3;

        let mut top = bottom.clone();
        top.name = "top-cards".to_string();
        top.rotation.degrees = 44.9;
        top.translation = Vec3::new(-2.0, 0.5, 0.0);
        top.color = Some(Vec4::new(0.85, 0.1, 0.1, 1.0));

        let mut ground = MeshSpec::new("ground", ShapeKind::Plane);
        ground.scale = Vec3::splat(8.0);
        ground.translation = Vec3::new(-4.0, 0.0, 2.0);
        ground.color = Some(Vec4::new(0.3, 0.5, 0.3, 1.0));

        Self {
            config: RendererConfig::default(),
            camera: CameraSpec::default(),
            lights: vec![
                Light::new(Vec3::new(3.0, 5.0, 3.0), Vec3::ONE, 1.0),
                Light::new(Vec3::new(-4.0, 3.0, -2.0), Vec3::new(1.0, 0.9, 0.7), 0.5),
            ],
            meshes: vec![bottom, top, ground],
        }
    }

    /// Registers the lights and meshes and applies the camera start pose.
    pub fn populate<B: RenderBackend>(&self, controller: &mut RenderController<B>) -> Result<()> {
        controller.set_camera(self.camera.build());
        for light in &self.lights {
            controller.register_light(*light)?;
        }
        for spec in &self.meshes {
            controller
                .register_mesh(&spec.name, &spec.build())
                .with_context(|| format!("failed to register mesh {}", spec.name))?;
        }
        Ok(())
    }
}

fn child<'a, 'input>(node: &Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|child| child.has_tag_name(tag))
}

fn required_text(node: &Node<'_, '_>, tag: &str) -> Result<String> {
    optional_text(node, tag).ok_or_else(|| anyhow!("<{tag}> tag is missing"))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    child(node, tag)
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_shape(node: &Node<'_, '_>) -> Result<ShapeKind> {
    let shape = required_text(node, "shape")?;
    Ok(match shape.to_ascii_lowercase().as_str() {
        "plane" => ShapeKind::Plane,
        "cube" => ShapeKind::Cube,
        "pyramid" => ShapeKind::Pyramid,
        "cylinder" => ShapeKind::Cylinder {
            sides: parse_u32(optional_text(node, "sides"), DEFAULT_CYLINDER_SIDES)?,
        },
        "sphere" => ShapeKind::Sphere {
            slices: parse_u32(optional_text(node, "slices"), DEFAULT_SPHERE_SLICES)?,
            stacks: parse_u32(optional_text(node, "stacks"), DEFAULT_SPHERE_STACKS)?,
        },
        other => bail!("unknown shape {other:?}"),
    })
}

fn parse_numbers<const N: usize>(value: &str, what: &str) -> Result<[f32; N]> {
    let components: Vec<&str> = value.split_whitespace().collect();
    if components.len() != N {
        bail!("{what} expects {N} components, found {}", components.len());
    }
    let mut numbers = [0.0; N];
    for (number, component) in numbers.iter_mut().zip(components) {
        *number = component
            .parse::<f32>()
            .map_err(|err| anyhow!("failed to parse {what} component {component:?}: {err}"))?;
    }
    Ok(numbers)
}

fn parse_vec3(value: Option<String>, default: Vec3) -> Result<Vec3> {
    let Some(value) = value else {
        return Ok(default);
    };
    Ok(Vec3::from_array(parse_numbers(&value, "vector")?))
}

/// `angle x y z`, angle in degrees.
fn parse_rotation(value: Option<String>, default: AxisAngle) -> Result<AxisAngle> {
    let Some(value) = value else {
        return Ok(default);
    };
    let [degrees, x, y, z] = parse_numbers(&value, "rotation")?;
    Ok(AxisAngle {
        degrees,
        axis: Vec3::new(x, y, z),
    })
}

/// `r g b [a]` in 0–255.
fn parse_color(value: Option<String>, default: Vec4) -> Result<Vec4> {
    let Some(value) = value else {
        return Ok(default);
    };
    let [r, g, b, a] = match value.split_whitespace().count() {
        3 => {
            let [r, g, b] = parse_numbers(&value, "color")?;
            [r, g, b, 255.0]
        }
        _ => parse_numbers(&value, "color")?,
    };
    Ok(Vec4::new(r, g, b, a) / 255.0)
}

fn parse_f32(value: Option<String>, default: f32) -> Result<f32> {
    match value {
        Some(value) => value
            .parse::<f32>()
            .map_err(|err| anyhow!("failed to parse float: {err}")),
        None => Ok(default),
    }
}

fn parse_u32(value: Option<String>, default: u32) -> Result<u32> {
    match value {
        Some(value) => value
            .parse::<u32>()
            .map_err(|err| anyhow!("failed to parse integer: {err}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RecordingBackend;
    use crate::render::ShaderKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
    <scene>
        <window>
            <width>800</width>
            <height>600</height>
            <title>Cards</title>
        </window>
        <camera>
            <position>0 2 6</position>
            <fov>60</fov>
        </camera>
        <light>
            <position>0 5 0</position>
            <color>255 128 0</color>
            <intensity>2.5</intensity>
        </light>
        <mesh>
            <name>ball</name>
            <shape>sphere</shape>
            <slices>12</slices>
            <stacks>6</stacks>
            <rotation>90 0 1 0</rotation>
            <translation>1 2 3</translation>
            <shininess>0.5</shininess>
        </mesh>
        <mesh>
            <name>post</name>
            <shape>cylinder</shape>
            <color>0 255 0</color>
        </mesh>
    </scene>
    "#;

    #[test]
    fn parse_scene_populates_all_sections() {
        let scene = SceneDescription::from_xml(SAMPLE).unwrap();
        assert_eq!((scene.config.width, scene.config.height), (800, 600));
        assert_eq!(scene.config.title, "Cards");
        assert_eq!(scene.camera.position, Vec3::new(0.0, 2.0, 6.0));
        assert_eq!(scene.camera.fov, 60.0);

        assert_eq!(scene.lights.len(), 1);
        let light = scene.lights[0];
        assert_eq!(light.position(), Vec3::new(0.0, 5.0, 0.0));
        assert_eq!(light.color(), Vec3::new(1.0, 128.0 / 255.0, 0.0));
        assert!((light.intensity() - 2.5).abs() < f32::EPSILON);

        assert_eq!(scene.meshes.len(), 2);
        let ball = &scene.meshes[0];
        assert_eq!(
            ball.shape,
            ShapeKind::Sphere {
                slices: 12,
                stacks: 6
            }
        );
        assert_eq!(ball.rotation.degrees, 90.0);
        assert_eq!(ball.translation, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(ball.shininess, 0.5);

        let post = &scene.meshes[1];
        assert_eq!(post.shape, ShapeKind::Cylinder { sides: 32 });
        assert_eq!(post.color, Some(Vec4::new(0.0, 1.0, 0.0, 1.0)));
    }

    #[test]
    fn missing_name_is_an_error() {
        let bad = "<scene><mesh><shape>cube</shape></mesh></scene>";
        assert!(SceneDescription::from_xml(bad).is_err());
    }

    #[test]
    fn unknown_shape_is_an_error() {
        let bad = "<scene><mesh><name>x</name><shape>torus</shape></mesh></scene>";
        let err = SceneDescription::from_xml(bad).unwrap_err();
        assert!(format!("{err:#}").contains("unknown shape"));
    }

    #[test]
    fn short_vectors_are_rejected() {
        let bad = "<scene><camera><position>1 2</position></camera></scene>";
        assert!(SceneDescription::from_xml(bad).is_err());
    }

    #[test]
    fn extra_components_are_rejected() {
        let bad = "<scene><camera><position>1 2 3 4</position></camera></scene>";
        let err = SceneDescription::from_xml(bad).unwrap_err();
        assert!(format!("{err:#}").contains("expects 3 components, found 4"));

        let bad = "<scene><light><color>1 2 3 4 5</color></light></scene>";
        assert!(SceneDescription::from_xml(bad).is_err());

        let bad = "<scene><mesh><name>x</name><shape>cube</shape>\
                   <rotation>90 0 1 0 0</rotation></mesh></scene>";
        assert!(SceneDescription::from_xml(bad).is_err());
    }

    #[test]
    fn colors_accept_optional_alpha() {
        let xml = "<scene><mesh><name>a</name><shape>cube</shape><color>255 0 0</color></mesh>\
                   <mesh><name>b</name><shape>cube</shape><color>0 255 0 51</color></mesh></scene>";
        let scene = SceneDescription::from_xml(xml).unwrap();
        assert_eq!(scene.meshes[0].color, Some(Vec4::new(1.0, 0.0, 0.0, 1.0)));
        assert_eq!(scene.meshes[1].color, Some(Vec4::new(0.0, 1.0, 0.0, 0.2)));
    }

    #[test]
    fn build_applies_transform_and_color() {
        let mut spec = MeshSpec::new("box", ShapeKind::Cube);
        spec.translation = Vec3::new(0.0, 0.0, -3.0);
        spec.color = Some(Vec4::new(1.0, 0.0, 0.0, 1.0));
        spec.shininess = 3.0;
        let mesh = spec.build();
        assert_eq!(
            mesh.model().transform_point3(Vec3::ZERO),
            Vec3::new(0.0, 0.0, -3.0)
        );
        assert_eq!(mesh.shininess(), 1.0);
        assert_eq!(
            mesh.attribute(5, crate::mesh::AttributeSlot::Color),
            Some(&[1.0, 0.0, 0.0, 1.0][..])
        );
    }

    #[test]
    fn textures_resolve_next_to_the_scene_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "<scene><mesh><name>floor</name><shape>plane</shape><texture>wood.png</texture></mesh></scene>"
        )
        .unwrap();
        let scene = SceneDescription::load(file.path()).unwrap();
        let expected = file.path().parent().unwrap().join("wood.png");
        assert_eq!(scene.meshes[0].texture.as_deref(), Some(expected.as_path()));
    }

    #[test]
    fn default_scene_registers_untextured_meshes() {
        let scene = SceneDescription::default_scene();
        let mut controller =
            RenderController::new(RecordingBackend::new(), scene.config.clone());
        scene.populate(&mut controller).unwrap();
        assert_eq!(controller.meshes().len(), 3);
        assert_eq!(controller.lights().len(), 2);
        assert!(controller
            .meshes()
            .iter()
            .all(|mesh| mesh.shader == ShaderKind::Untextured));
        assert_eq!(controller.camera().position(), Vec3::new(0.0, 1.5, 5.0));
    }
}
