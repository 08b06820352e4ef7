use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use crs_transform::{
    Direction, DirectTransform, Error, Point, ProjDbLookup, Rect, Transform, TransformBuilder,
    TransformState,
};
use log::{debug, error, warn};
use std::process;

fn parse_rect(value: &str) -> Result<Rect, String> {
    let parts = value
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| format!("invalid rectangle `{value}`: {err}"))?;
    match parts.as_slice() {
        [x_min, y_min, x_max, y_max] => Ok(Rect::new(*x_min, *y_min, *x_max, *y_max)),
        _ => Err(format!("expected XMIN,YMIN,XMAX,YMAX, got `{value}`")),
    }
}

fn command() -> Command {
    Command::new("crs-transform")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Transform coordinates between two coordinate reference systems")
        .arg(
            Arg::new("from")
                .short('f')
                .long("from")
                .value_name("CRS")
                .help("Source CRS definition; WGS84 when omitted"),
        )
        .arg(
            Arg::new("to")
                .short('t')
                .long("to")
                .value_name("CRS")
                .help("Destination CRS definition; the source when omitted"),
        )
        .arg(
            Arg::new("inverse")
                .short('i')
                .long("inverse")
                .help("Transform from the destination CRS to the source CRS")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("direct")
                .long("direct")
                .help("Let PROJ pick a single operation between the two CRSs")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("rect")
                .long("rect")
                .value_name("XMIN,YMIN,XMAX,YMAX")
                .help("Transform a rectangle instead of a point")
                .allow_hyphen_values(true)
                .value_parser(parse_rect),
        )
        .arg(
            Arg::new("envelope")
                .long("envelope")
                .value_name("N")
                .help("Envelope the rectangle's outline, sampling N points per edge")
                .requires("rect")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("coordinate")
                .value_name("X Y")
                .help("Point to transform")
                .num_args(2)
                .allow_negative_numbers(true)
                .required_unless_present("rect")
                .value_parser(value_parser!(f64)),
        )
}

fn build(matches: &ArgMatches) -> Result<Box<dyn Transform>, Error> {
    let source = matches.get_one::<String>("from").map_or("", String::as_str);
    let destination = matches.get_one::<String>("to").map_or("", String::as_str);
    let builder = TransformBuilder::new().lookup(ProjDbLookup::new());

    if matches.get_flag("direct") {
        return Ok(Box::new(DirectTransform::with_builder(&builder, source, destination)?));
    }
    let transform = builder.build(source, destination);
    match transform.state() {
        TransformState::Failed => {
            warn!("Transform could not be set up; coordinates are passed through unchanged")
        }
        TransformState::ShortCircuit => debug!("Source and destination are identical"),
        _ => {}
    }
    Ok(Box::new(transform))
}

fn run(matches: &ArgMatches) -> Result<(), Error> {
    let transform = build(matches)?;
    let direction = if matches.get_flag("inverse") {
        Direction::Inverse
    } else {
        Direction::Forward
    };

    if let Some(rect) = matches.get_one::<Rect>("rect") {
        let result = match matches.get_one::<usize>("envelope") {
            Some(&densify) => transform.transform_rect_enveloping(*rect, direction, densify)?,
            None => transform.transform_rect(*rect, direction)?,
        };
        println!(
            "{},{},{},{}",
            result.x_min, result.y_min, result.x_max, result.y_max
        );
        return Ok(());
    }

    let coordinate: Vec<f64> = matches
        .get_many::<f64>("coordinate")
        .map(|values| values.copied().collect())
        .unwrap_or_default();
    if let [x, y] = coordinate.as_slice() {
        let point = transform.transform_point(Point::new(*x, *y), direction)?;
        println!("{} {}", point.x, point.y);
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let matches = command().get_matches();
    if let Err(err) = run(&matches) {
        error!("{err}");
        eprintln!("Error: {err}");
        process::exit(1);
    }
}
