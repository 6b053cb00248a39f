//! A small in-memory schedule shared by tests.
//!
//! Saturday 2015-02-14 is the reference service date. Pink run 301 has two
//! Saturday trips and one weekday trip; Blue run 217 has one Saturday trip;
//! bus route 22 has trips in both directions.

use std::sync::Arc;

use chrono::NaiveDate;
use rusqlite::Connection;

use super::{ScheduleStore, SqliteStore};

const SCHEMA: &str = "
CREATE TABLE routes (
    route_id TEXT PRIMARY KEY, route_short_name TEXT, route_long_name TEXT,
    route_type INTEGER, route_url TEXT, route_color TEXT, route_text_color TEXT
);
CREATE TABLE calendar (
    service_id TEXT PRIMARY KEY,
    monday INTEGER, tuesday INTEGER, wednesday INTEGER, thursday INTEGER,
    friday INTEGER, saturday INTEGER, sunday INTEGER,
    start_date TEXT, end_date TEXT
);
CREATE TABLE trips (
    route_id TEXT, service_id TEXT, trip_id TEXT PRIMARY KEY, direction_id INTEGER,
    block_id TEXT, shape_id TEXT, direction TEXT, wheelchair_accessible INTEGER,
    schd_trip_id TEXT
);
CREATE TABLE stop_times (
    trip_id TEXT, arrival_time TEXT, departure_time TEXT, stop_id INTEGER,
    stop_sequence INTEGER, stop_headsign TEXT, pickup_type INTEGER,
    shape_dist_traveled REAL
);
CREATE TABLE stops (
    stop_id INTEGER PRIMARY KEY, stop_code TEXT, stop_name TEXT, stop_desc TEXT,
    stop_lat REAL, stop_lon REAL, location_type INTEGER, parent_station INTEGER,
    wheelchair_boarding INTEGER
);
CREATE TABLE transfers (
    from_stop_id INTEGER, to_stop_id INTEGER, transfer_type INTEGER,
    min_transfer_time INTEGER
);
CREATE TABLE shapes (
    shape_id TEXT, shape_pt_lat REAL, shape_pt_lon REAL, shape_pt_sequence INTEGER,
    shape_dist_traveled REAL
);
";

const DATA: &str = "
INSERT INTO routes VALUES
    ('Pink', NULL, 'Pink Line', 1, 'http://www.transitchicago.com/pinkline', 'E27EA6', 'FFFFFF'),
    ('Blue', NULL, 'Blue Line', 1, 'http://www.transitchicago.com/blueline', '00A1DE', 'FFFFFF'),
    ('22', '22', 'Clark', 3, NULL, '565a5c', 'FFFFFF');

INSERT INTO calendar VALUES
    ('SAT', 0, 0, 0, 0, 0, 1, 0, '20150103', '20150328'),
    ('WKD', 1, 1, 1, 1, 1, 0, 0, '20150105', '20150327'),
    ('OLD', 1, 1, 1, 1, 1, 1, 1, '20140101', '20141231');

INSERT INTO stops VALUES
    (30114, NULL, '54th/Cermak (Loop-bound)', NULL, 41.85177, -87.75669, 0, 40580, 1),
    (40580, NULL, '54th/Cermak', NULL, 41.85177, -87.75669, 1, NULL, 1),
    (30162, NULL, 'Ashland (Loop-bound)', NULL, 41.85, -87.66, 0, 40170, 1),
    (40170, NULL, 'Ashland', NULL, 41.85, -87.66, 1, NULL, 1),
    (30141, NULL, 'Clinton (Loop-bound)', NULL, 41.88, -87.64, 0, 41160, 1),
    (41160, NULL, 'Clinton', NULL, 41.88, -87.64, 1, NULL, 1),
    (30375, NULL, 'Clark/Lake (O''Hare-bound)', NULL, 41.88, -87.63, 0, 40380, 1),
    (40380, NULL, 'Clark/Lake', NULL, 41.88, -87.63, 1, NULL, 1),
    (30171, NULL, 'O''Hare (Terminal Arrival)', NULL, 41.98, -87.90, 0, 40890, 1),
    (40890, NULL, 'O''Hare', NULL, 41.98, -87.90, 1, NULL, 1),
    (1836, '1836', 'Clark & Diversey', NULL, 41.93, -87.64, 0, NULL, 1),
    (15895, '15895', 'Clark & Belmont', NULL, 41.94, -87.65, 0, NULL, 1),
    (1850, '1850', 'Clark & Howard', NULL, 42.02, -87.67, 0, NULL, 1);

INSERT INTO trips VALUES
    ('Pink', 'SAT', 'P301A', 1, 'BP1', 'S301', 'Loop', 1, 'R301'),
    ('Pink', 'SAT', 'P301B', 0, 'BP1', 'S301', NULL, 1, 'R301'),
    ('Pink', 'WKD', 'P301W', 1, 'BP2', 'S301', 'Loop', 1, 'R301'),
    ('Blue', 'SAT', 'B217A', 0, 'BB1', NULL, 'O''Hare', 1, 'R217'),
    ('22', 'SAT', '22E1', 0, 'B22', NULL, 'East', 1, '65000'),
    ('22', 'SAT', '22N1', 0, 'B22', NULL, 'North', 1, '65001'),
    ('22', 'SAT', '22N2', 0, 'B22', NULL, 'North', 1, '65002'),
    ('22', 'SAT', '22S1', 1, 'B22', NULL, 'South', 0, '65003'),
    ('22', 'WKD', '22NW', 0, 'B22', NULL, 'North', 1, '65004'),
    ('22', 'OLD', '22NO', 0, 'B22', NULL, 'North', 1, '65005');

INSERT INTO stop_times VALUES
    ('P301A', '12:00:00', '12:00:00', 30114, 1, NULL, 0, 0.0),
    ('P301A', '12:15:00', '12:15:00', 30162, 2, NULL, 0, 20000.0),
    ('P301A', '12:30:00', '12:30:00', 30141, 3, NULL, 0, 30000.0),
    ('P301B', '12:40:00', '12:40:00', 30141, 1, '54th/Cermak', 0, 0.0),
    ('P301B', '13:00:00', '13:00:00', 30162, 2, '54th/Cermak', 0, 10000.0),
    ('P301B', '13:10:00', '13:10:00', 30114, 3, '54th/Cermak', 0, 30000.0),
    ('P301W', '12:05:00', '12:05:00', 30114, 1, NULL, 0, 0.0),
    ('P301W', '12:50:00', '12:50:00', 30141, 2, NULL, 0, 30000.0),
    ('B217A', '12:00:00', '12:00:00', 30375, 1, NULL, 0, 0.0),
    ('B217A', '12:45:00', '12:45:00', 30171, 2, NULL, 0, 90000.0),
    ('22E1', '9:00:00', '9:00:00', 1836, 1, NULL, 0, NULL),
    ('22E1', '9:45:00', '9:45:00', 15895, 2, NULL, 0, NULL),
    ('22E1', '10:30:00', '10:30:00', 1850, 3, NULL, 0, NULL),
    ('22N1', '10:00:00', '10:00:00', 1836, 1, NULL, 0, NULL),
    ('22N1', '10:20:00', '10:20:00', 15895, 2, NULL, 0, NULL),
    ('22N1', '11:00:00', '11:00:00', 1850, 3, NULL, 0, NULL),
    ('22N2', '15:00:00', '15:00:00', 1836, 1, NULL, 0, NULL),
    ('22N2', '15:30:00', '15:30:00', 15895, 2, NULL, 0, NULL),
    ('22N2', '16:10:00', '16:10:00', 1850, 3, NULL, 0, NULL),
    ('22S1', '17:00:00', '17:00:00', 1850, 1, NULL, 0, NULL),
    ('22S1', '17:30:00', '17:30:00', 15895, 2, NULL, 0, NULL),
    ('22S1', '18:00:00', '18:00:00', 1836, 3, NULL, 0, NULL),
    ('22NW', '11:00:00', '11:00:00', 1836, 1, NULL, 0, NULL),
    ('22NW', '12:00:00', '12:00:00', 1850, 2, NULL, 0, NULL),
    ('22NO', '11:00:00', '11:00:00', 1836, 1, NULL, 0, NULL),
    ('22NO', '23:00:00', '23:00:00', 1850, 2, NULL, 0, NULL);

INSERT INTO transfers VALUES
    (30141, 30162, 2, 120),
    (1836, 15895, 0, NULL);

INSERT INTO shapes VALUES
    ('S301', 41.85177, -87.75669, 1, 0.0),
    ('S301', 41.85, -87.66, 2, 20000.0),
    ('S301', 41.88, -87.64, 3, 30000.0);
";

/// The reference service date, a Saturday.
pub(crate) fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 2, 14).unwrap()
}

/// Create the schedule tables and rows on `conn`.
pub(crate) fn load(conn: &Connection) {
    conn.execute_batch(SCHEMA).unwrap();
    conn.execute_batch(DATA).unwrap();
}

pub(crate) fn schedule() -> SqliteStore {
    let conn = Connection::open_in_memory().unwrap();
    load(&conn);
    SqliteStore::from_connection(conn)
}

pub(crate) fn store() -> Arc<dyn ScheduleStore> {
    Arc::new(schedule())
}
