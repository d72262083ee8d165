//! A small whitespace/CSV hybrid text format for building a [`ProblemData`]
//! in tests and the CLI harness. Not a VRPLIB/TSPLIB parser — that remains an
//! external collaborator, per the crate's scope.
//!
//! Format (comma-separated fields per line, blank lines and `#` comments
//! skipped):
//! ```text
//! num_depots,num_clients,num_profiles,num_dimensions
//! <one line per location>  x,y,tw_early,tw_late,service,release,prize,required,delivery...,pickup...
//! num_vehicle_types
//! <one line per vehicle type>  num_available,start_depot,end_depot,max_reloads,fixed_cost,
//!     unit_dist,unit_dur,unit_overtime,profile,name,capacity...
//! <num_profiles * num_locations * num_locations lines>  profile,from,to,distance,duration
//! ```

use crate::problem::problem::{Location, ProblemData, ProblemError, VehicleType};
use crate::types::*;
use crate::utils::Matrix3;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};

#[derive(Debug)]
pub enum LoaderError {
    Io(String),
    Parse { line: usize, detail: String },
    NoVehicleTypes,
}

impl fmt::Display for LoaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoaderError::Io(msg) => write!(f, "io error: {msg}"),
            LoaderError::Parse { line, detail } => write!(f, "line {line}: {detail}"),
            LoaderError::NoVehicleTypes => write!(f, "instance declares zero vehicle types"),
        }
    }
}

impl std::error::Error for LoaderError {}

struct Lines {
    inner: std::vec::IntoIter<(usize, String)>,
}

impl Lines {
    fn next(&mut self) -> Result<(usize, String), LoaderError> {
        self.inner.next().ok_or(LoaderError::Io("unexpected end of input".into()))
    }
}

fn parse_field<T: std::str::FromStr>(line_no: usize, parts: &[&str], idx: usize, what: &str) -> Result<T, LoaderError> {
    parts
        .get(idx)
        .ok_or_else(|| LoaderError::Parse { line: line_no, detail: format!("missing field {what}") })?
        .trim()
        .parse()
        .map_err(|_| LoaderError::Parse { line: line_no, detail: format!("bad {what}") })
}

impl ProblemData {
    pub fn load_text(path: &str) -> Result<Self, LoaderError> {
        let file = File::open(path).map_err(|e| LoaderError::Io(e.to_string()))?;
        let reader = BufReader::new(file);
        let raw: Vec<(usize, String)> = reader
            .lines()
            .enumerate()
            .map(|(i, l)| l.map(|s| (i + 1, s)).map_err(|e| LoaderError::Io(e.to_string())))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter(|(_, s)| {
                let trimmed = s.trim();
                !trimmed.is_empty() && !trimmed.starts_with('#')
            })
            .collect();
        let mut lines = Lines { inner: raw.into_iter() };

        let (n, header) = lines.next()?;
        let header: Vec<&str> = header.split(',').collect();
        let num_depots: usize = parse_field(n, &header, 0, "num_depots")?;
        let num_clients: usize = parse_field(n, &header, 1, "num_clients")?;
        let num_profiles: usize = parse_field(n, &header, 2, "num_profiles")?;
        let num_dimensions: usize = parse_field(n, &header, 3, "num_dimensions")?;
        let num_locations = num_depots + num_clients;

        let mut locations = Vec::with_capacity(num_locations);
        for _ in 0..num_locations {
            let (n, line) = lines.next()?;
            let parts: Vec<&str> = line.split(',').collect();
            let x: f64 = parse_field(n, &parts, 0, "x")?;
            let y: f64 = parse_field(n, &parts, 1, "y")?;
            let tw_early: Duration = parse_field(n, &parts, 2, "tw_early")?;
            let tw_late: Duration = parse_field(n, &parts, 3, "tw_late")?;
            let service_duration: Duration = parse_field(n, &parts, 4, "service")?;
            let release_time: Duration = parse_field(n, &parts, 5, "release")?;
            let prize: Cost = parse_field(n, &parts, 6, "prize")?;
            let required: u8 = parse_field(n, &parts, 7, "required")?;

            let mut delivery = Vec::with_capacity(num_dimensions);
            let mut pickup = Vec::with_capacity(num_dimensions);
            for d in 0..num_dimensions {
                delivery.push(parse_field(n, &parts, 8 + d, "delivery")?);
            }
            for d in 0..num_dimensions {
                pickup.push(parse_field(n, &parts, 8 + num_dimensions + d, "pickup")?);
            }

            locations.push(Location {
                x,
                y,
                tw_early,
                tw_late,
                service_duration,
                release_time,
                prize,
                required: required != 0,
                group_id: None,
                delivery,
                pickup,
            });
        }

        let (n, vt_count_line) = lines.next()?;
        let num_vehicle_types: usize = vt_count_line
            .trim()
            .parse()
            .map_err(|_| LoaderError::Parse { line: n, detail: "bad num_vehicle_types".into() })?;
        if num_vehicle_types == 0 {
            return Err(LoaderError::NoVehicleTypes);
        }

        let mut vehicle_types = Vec::with_capacity(num_vehicle_types);
        for _ in 0..num_vehicle_types {
            let (n, line) = lines.next()?;
            let parts: Vec<&str> = line.split(',').collect();
            let num_available: u32 = parse_field(n, &parts, 0, "num_available")?;
            let start_depot: usize = parse_field(n, &parts, 1, "start_depot")?;
            let end_depot: usize = parse_field(n, &parts, 2, "end_depot")?;
            let max_reloads: u32 = parse_field(n, &parts, 3, "max_reloads")?;
            let fixed_cost: Cost = parse_field(n, &parts, 4, "fixed_cost")?;
            let unit_distance_cost: Cost = parse_field(n, &parts, 5, "unit_dist")?;
            let unit_duration_cost: Cost = parse_field(n, &parts, 6, "unit_dur")?;
            let unit_overtime_cost: Cost = parse_field(n, &parts, 7, "unit_overtime")?;
            let profile: usize = parse_field(n, &parts, 8, "profile")?;
            let name: String = parts
                .get(9)
                .ok_or_else(|| LoaderError::Parse { line: n, detail: "missing name".into() })?
                .trim()
                .to_string();

            let mut capacity = Vec::with_capacity(num_dimensions);
            for d in 0..num_dimensions {
                capacity.push(parse_field(n, &parts, 10 + d, "capacity")?);
            }

            vehicle_types.push(VehicleType {
                num_available,
                capacity,
                start_depot: LocationIdx::new(start_depot),
                end_depot: LocationIdx::new(end_depot),
                reload_depots: Vec::new(),
                max_reloads,
                shift_duration: None,
                max_duration: None,
                max_distance: None,
                tw_early: 0,
                tw_late: Duration::MAX / 4,
                fixed_cost,
                unit_distance_cost,
                unit_duration_cost,
                unit_overtime_cost,
                reload_cost: 0,
                profile: ProfileIdx::new(profile),
                name,
                allowed_clients: None,
            });
        }

        let mut distance = Matrix3::new(num_profiles, num_locations, num_locations, 0 as Distance);
        let mut duration = Matrix3::new(num_profiles, num_locations, num_locations, 0 as Duration);
        for _ in 0..(num_profiles * num_locations * num_locations) {
            let (n, line) = lines.next()?;
            let parts: Vec<&str> = line.split(',').collect();
            let profile: usize = parse_field(n, &parts, 0, "profile")?;
            let from: usize = parse_field(n, &parts, 1, "from")?;
            let to: usize = parse_field(n, &parts, 2, "to")?;
            let dist: Distance = parse_field(n, &parts, 3, "distance")?;
            let dur: Duration = parse_field(n, &parts, 4, "duration")?;
            *distance.get_mut(profile, from, to) = dist;
            *duration.get_mut(profile, from, to) = dur;
        }

        ProblemData::new(locations, num_depots, distance, duration, vehicle_types, Vec::new(), Vec::new())
            .map_err(|e: ProblemError| LoaderError::Parse { line: 0, detail: e.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_trivial_one_client_instance() {
        let mut file = tempfile_like().unwrap();
        writeln!(file, "1,1,1,1").unwrap();
        writeln!(file, "0,0,0,1000,0,0,0,1,0,0").unwrap();
        writeln!(file, "10,0,0,1000,0,0,0,1,5,0").unwrap();
        writeln!(file, "1").unwrap();
        writeln!(file, "1,0,0,0,0,1,0,0,0,veh,20").unwrap();
        for (from, to, dist) in [(0, 0, 0), (0, 1, 10), (1, 0, 10), (1, 1, 0)] {
            writeln!(file, "0,{from},{to},{dist},{dist}").unwrap();
        }
        let path = file.path_string();

        let problem = ProblemData::load_text(&path).unwrap();
        assert_eq!(problem.num_depots, 1);
        assert_eq!(problem.num_clients, 1);
        assert_eq!(problem.vehicle_types.len(), 1);
        assert_eq!(problem.distance(ProfileIdx::new(0), LocationIdx::new(0), LocationIdx::new(1)), 10);
    }

    struct TempFile {
        file: File,
        path: std::path::PathBuf,
    }

    impl TempFile {
        fn path_string(&self) -> String {
            self.path.to_string_lossy().to_string()
        }
    }

    impl Write for TempFile {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.file.write(buf)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            self.file.flush()
        }
    }

    fn tempfile_like() -> std::io::Result<TempFile> {
        let path = std::env::temp_dir().join(format!("vrp_loader_test_{}.txt", std::process::id()));
        let file = File::create(&path)?;
        Ok(TempFile { file, path })
    }
}
