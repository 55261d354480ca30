use std::env;
use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use csv_bind::{
    escape, tokenize, Charset, Descriptor, DescriptorConfig, Error,
    FormatRegistry, Reader, Writer,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
struct Person {
    name: String,
    age: u32,
}

fn person(name: &str, age: u32) -> Person {
    Person { name: name.to_string(), age: age }
}

fn persons(has_header: bool) -> Descriptor<Person> {
    Descriptor::builder()
        .named_column("Name", "name")
        .named_column("Age", "age")
        .has_header(has_header)
        .build()
        .unwrap()
}

fn read_all<T: serde::de::DeserializeOwned>(
    descriptor: &Descriptor<T>,
    data: &[u8],
) -> Vec<T> {
    Reader::new(descriptor, data)
        .unwrap()
        .collect::<Result<Vec<T>, Error>>()
        .unwrap()
}

fn write_all<T, S: Serialize>(descriptor: &Descriptor<T>, records: &[S]) -> Vec<u8> {
    let mut wtr = Writer::new(descriptor, vec![]).unwrap();
    wtr.write_all(records).unwrap();
    wtr.into_inner().unwrap()
}

fn tmp_path(name: &str) -> PathBuf {
    env::temp_dir().join(format!("csv-bind-{}-{}", std::process::id(), name))
}

#[test]
fn end_to_end_output() {
    let d = persons(true);
    let out = write_all(&d, &[person("John Doe", 54)]);
    assert_eq!(out, b"Name,Age\r\nJohn Doe,54\r\n");

    let out = write_all(&d, &[person("Grand Doe, \"Elder\"", 77)]);
    assert_eq!(out, b"Name,Age\r\n\"Grand Doe, \"\"Elder\"\"\",77\r\n");
}

#[test]
fn round_trip() {
    let d = persons(true);
    let people = vec![
        person("John Doe", 54),
        person("Grand Doe, \"Elder\"", 77),
        person("Anne #2", 1),
        person("", 0),
    ];
    let out = write_all(&d, &people);
    assert_eq!(read_all(&d, &out), people);
}

#[test]
fn round_trip_without_header() {
    let d = persons(false);
    let people = vec![person("Ann", 1), person("Bob; Jr", 2)];
    let out = write_all(&d, &people);
    assert_eq!(out, b"Ann,1\r\nBob; Jr,2\r\n");
    assert_eq!(read_all(&d, &out), people);
}

#[test]
fn comments_and_blank_lines() {
    let d = persons(true);
    let data = "Name,Age\n# first comment\n\nJohn Doe,54\n   \n#,\nJane,\n";
    let people = read_all(&d, data.as_bytes());
    assert_eq!(
        people,
        vec![person("John Doe", 54), person("   ", 0), person("Jane", 0)]
    );
}

#[test]
fn column_count_mismatch_is_tolerated() {
    let d = persons(false);
    let data = "Ann\nBob,2,spare\nCid,3\n";
    assert_eq!(
        read_all(&d, data.as_bytes()),
        vec![person("Ann", 0), person("Bob", 2), person("Cid", 3)]
    );
}

#[test]
fn null_token_is_not_read_back() {
    #[derive(Debug, Deserialize, Serialize, PartialEq)]
    struct Contact {
        name: String,
        email: Option<String>,
    }

    let d = Descriptor::builder()
        .column("name")
        .column("email")
        .build::<Contact>()
        .unwrap();
    let out = write_all(&d, &[Contact { name: "Ann".into(), email: None }]);
    assert_eq!(out, b"Ann,null\r\n");
    let back = read_all(&d, &out);
    assert_eq!(back[0].email, Some("null".to_string()));
}

#[test]
fn null_record_leaves_writer_usable() {
    let d = persons(true);
    let mut wtr = Writer::new(&d, vec![]).unwrap();
    assert!(matches!(wtr.write(&None::<Person>), Err(Error::NullRecord)));
    wtr.write(&person("Ann", 1)).unwrap();
    assert_eq!(wtr.into_inner().unwrap(), b"Name,Age\r\nAnn,1\r\n");
}

#[test]
fn config_from_json() {
    #[derive(Debug, Deserialize, Serialize, PartialEq)]
    struct Holiday {
        name: String,
        day: NaiveDate,
        paid: bool,
    }

    let config: DescriptorConfig = serde_json::from_str(
        r#"{
            "type": "Holiday",
            "separator": "semicolon",
            "has-header": true,
            "columns": [
                { "name": "Name", "property": "name" },
                { "name": "Day", "property": "day", "format": "short-date" },
                { "name": "Paid", "property": "paid", "format": "yes-no" }
            ]
        }"#,
    )
    .unwrap();
    let d = config.build::<Holiday>(&FormatRegistry::default()).unwrap();

    let holidays = vec![
        Holiday {
            name: "New Year; observed".into(),
            day: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            paid: true,
        },
        Holiday {
            name: "Bastille".into(),
            day: NaiveDate::from_ymd_opt(2026, 7, 14).unwrap(),
            paid: false,
        },
    ];
    let out = write_all(&d, &holidays);
    assert_eq!(
        String::from_utf8(out.clone()).unwrap(),
        "Name;Day;Paid\r\n\
         \"New Year; observed\";01/01/26;yes\r\n\
         Bastille;07/14/26;no\r\n"
    );
    assert_eq!(read_all(&d, &out), holidays);
}

#[test]
fn latin1_files() {
    let d = Descriptor::builder()
        .named_column("Name", "name")
        .named_column("Age", "age")
        .has_header(true)
        .charset(Charset::Latin1)
        .build::<Person>()
        .unwrap();
    let path = tmp_path("latin1.csv");

    let mut wtr = Writer::from_path(&d, &path).unwrap();
    wtr.write(&person("Zoë", 9)).unwrap();
    wtr.close().unwrap();
    assert_eq!(fs::read(&path).unwrap(), b"Name,Age\r\nZo\xEB,9\r\n");

    let people: Vec<Person> = Reader::from_path(&d, &path)
        .unwrap()
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(people, vec![person("Zoë", 9)]);
    fs::remove_file(&path).unwrap();
}

#[test]
fn invalid_utf8_is_replaced() {
    let d = persons(false);
    assert_eq!(read_all(&d, b"Zo\xEB,9\n"), vec![person("Zo\u{FFFD}", 9)]);
}

#[test]
fn descriptors_are_shared_across_threads() {
    let d = persons(false);
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let d = d.clone();
            std::thread::spawn(move || {
                let data = format!("t{},{}\n", i, i);
                read_all(&d, data.as_bytes())
            })
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), vec![person(&format!("t{}", i), i as u32)]);
    }
}

#[test]
fn line_helpers() {
    assert_eq!(tokenize("a,b,c", ','), vec!["a", "b", "c"]);
    assert_eq!(tokenize("\"a,b\",c", ','), vec!["a,b", "c"]);
    assert_eq!(tokenize("\"a\"\"b\"", ','), vec!["a\"b"]);
    assert_eq!(escape("a,b", ','), "\"a,b\"");
    assert_eq!(escape("a\"b", ','), "\"a\"\"b\"");
    assert_eq!(escape("a\r\nb", ','), "\"a\r\nb\"");
    assert_eq!(escape("plain", ','), "plain");
}

#[test]
fn malformed_dates_still_produce_records() {
    #[derive(Debug, Deserialize, PartialEq)]
    struct Holiday {
        name: String,
        day: Option<NaiveDate>,
    }

    let d = Descriptor::builder()
        .column("name")
        .column_with_format(None, "day", csv_bind::format::DateFormat::new("%d/%m/%Y"))
        .build::<Holiday>()
        .unwrap();
    let data = "Ann,01/02/2020\nBob,garbage\nCid\nDan,03/04/2021\n";
    let items: Vec<Result<Holiday, Error>> =
        Reader::new(&d, data.as_bytes()).unwrap().collect();
    assert_eq!(items.len(), 4);
    let days: Vec<Option<NaiveDate>> =
        items.into_iter().map(|r| r.unwrap().day).collect();
    assert_eq!(
        days,
        vec![
            NaiveDate::from_ymd_opt(2020, 2, 1),
            None,
            None,
            NaiveDate::from_ymd_opt(2021, 4, 3),
        ]
    );
}
