use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use log::warn;
use ndarray::{Array2, Axis};
use ply_rs::ply::{
    self, Addable, DefaultElement, ElementDef, Encoding, Ply, Property, PropertyDef, PropertyType,
    ScalarType,
};
use ply_rs::parser;
use ply_rs::writer::Writer;

use crate::{error::Error, pointcloud::PointCloud};

/// Vertex record, coordinates are read in any float precision.
struct Vertex {
    point: [f64; 3],
    color: [u8; 3],
}

impl ply::PropertyAccess for Vertex {
    fn new() -> Self {
        Vertex {
            point: [0.0; 3],
            color: [0; 3],
        }
    }

    fn set_property(&mut self, key: String, property: ply::Property) {
        let coord = match key.as_str() {
            "x" => Some(0),
            "y" => Some(1),
            "z" => Some(2),
            _ => None,
        };
        match (coord, key.as_str(), property) {
            (Some(i), _, Property::Double(v)) => self.point[i] = v,
            (Some(i), _, Property::Float(v)) => self.point[i] = v as f64,
            (None, "red", Property::UChar(v)) => self.color[0] = v,
            (None, "green", Property::UChar(v)) => self.color[1] = v,
            (None, "blue", Property::UChar(v)) => self.color[2] = v,
            (_, key, _) => warn!("Ignoring ply vertex property {key}"),
        }
    }
}

/// Reads the vertices of a PLY file as a point cloud.
pub fn read_ply<P>(filepath: P) -> Result<PointCloud, Error>
where
    P: AsRef<Path>,
{
    let mut f = BufReader::new(File::open(filepath)?);

    let vertex_parser = parser::Parser::<Vertex>::new();
    let header = vertex_parser.read_header(&mut f)?;

    let element = header
        .elements
        .get("vertex")
        .ok_or_else(|| Error::parser("PLY file has no vertex element"))?;
    let has_colors = ["red", "green", "blue"]
        .iter()
        .all(|k| element.properties.contains_key(*k));
    let vertices = vertex_parser.read_payload_for_element(&mut f, element, &header)?;

    Ok(PointCloud {
        points: Array2::from_shape_fn((vertices.len(), 3), |(i, c)| vertices[i].point[c]),
        colors: has_colors
            .then(|| Array2::from_shape_fn((vertices.len(), 3), |(i, c)| vertices[i].color[c])),
    })
}

/// Writes a point cloud as an ASCII PLY with double coordinates.
pub fn write_ply<P>(filepath: P, cloud: &PointCloud) -> Result<(), Error>
where
    P: AsRef<Path>,
{
    let mut ply = Ply::<DefaultElement>::new();
    ply.header.encoding = Encoding::Ascii;

    let mut vertex_element = ElementDef::new("vertex".to_string());
    ["x", "y", "z"].iter().for_each(|key| {
        vertex_element.properties.add(PropertyDef::new(
            key.to_string(),
            PropertyType::Scalar(ScalarType::Double),
        ));
    });

    let mut vertex_array: Vec<DefaultElement> = cloud
        .points
        .axis_iter(Axis(0))
        .map(|point| {
            let mut elem = DefaultElement::new();
            elem.insert("x".to_string(), Property::Double(point[0]));
            elem.insert("y".to_string(), Property::Double(point[1]));
            elem.insert("z".to_string(), Property::Double(point[2]));
            elem
        })
        .collect();

    if let Some(colors) = &cloud.colors {
        ["red", "green", "blue"].iter().for_each(|key| {
            vertex_element.properties.add(PropertyDef::new(
                key.to_string(),
                PropertyType::Scalar(ScalarType::UChar),
            ));
        });

        colors
            .axis_iter(Axis(0))
            .zip(vertex_array.iter_mut())
            .for_each(|(color, elem)| {
                elem.insert("red".to_string(), Property::UChar(color[0]));
                elem.insert("green".to_string(), Property::UChar(color[1]));
                elem.insert("blue".to_string(), Property::UChar(color[2]));
            });
    }

    ply.header.elements.add(vertex_element);
    ply.payload.insert("vertex".to_string(), vertex_array);
    ply.make_consistent()
        .map_err(|err| Error::invalid_parameter(format!("Inconsistent PLY: {err:?}")))?;

    let mut buf = BufWriter::new(File::create(filepath)?);
    Writer::new().write_ply(&mut buf, &mut ply)?;
    buf.flush()?;

    Ok(())
}
