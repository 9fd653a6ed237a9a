pub mod coords;
pub mod etl;
pub mod geojson;
pub mod kml;
pub mod scoring;
pub mod table;

pub use crate::domain::model::{
    BoundingBox, Candidate, CoordinatePair, Placemark, RunReport, SearchHit, WebsiteRow,
};
pub use crate::domain::ports::{Geocoder, Pipeline, Storage, WebSearch};
pub use crate::utils::error::Result;
