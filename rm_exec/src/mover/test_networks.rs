//! Small networks shared by the engine tests.

use std::f64::consts::{FRAC_PI_2, PI};

use road_net::{
    builder::RoadBuilder, Connection, ContactPoint, Junction, Lane, LinkTarget,
    NetworkDescription, RoadNetwork,
};

pub const LANE_WIDTH_M: f64 = 3.5;

/// Radius of the turning connecting roads in [`t_junction`]
pub const TURN_RADIUS_M: f64 = 20.0;

fn two_way() -> Vec<Lane> {
    vec![
        Lane::driving(-1, LANE_WIDTH_M),
        Lane::driving(1, LANE_WIDTH_M),
    ]
}

fn link(id: i32, contact: ContactPoint) -> LinkTarget {
    LinkTarget::Road { id, contact }
}

fn network(roads: Vec<road_net::Road>, junctions: Vec<Junction>) -> RoadNetwork {
    RoadNetwork::new(NetworkDescription {
        name: "test".into(),
        roads,
        junctions,
    })
    .unwrap()
}

/// Road 1 (100 m) running east, directly followed by road 2 (50 m).
pub fn two_roads() -> RoadNetwork {
    network(
        vec![
            RoadBuilder::new(1)
                .line(100.0)
                .lanes(vec![Lane::driving(-1, LANE_WIDTH_M)])
                .successor(link(2, ContactPoint::Start))
                .speed(0.0, 20.0)
                .build(),
            RoadBuilder::new(2)
                .start(100.0, 0.0, 0.0)
                .line(50.0)
                .lanes(vec![Lane::driving(-1, LANE_WIDTH_M)])
                .predecessor(link(1, ContactPoint::End))
                .speed(0.0, 10.0)
                .build(),
        ],
        vec![],
    )
}

/// Road 1 running east meets road 3 head on: road 3 runs west and ends where road 1 ends.
pub fn head_to_head() -> RoadNetwork {
    network(
        vec![
            RoadBuilder::new(1)
                .line(100.0)
                .lanes(two_way())
                .successor(link(3, ContactPoint::End))
                .build(),
            RoadBuilder::new(3)
                .start(150.0, 0.0, PI)
                .line(50.0)
                .lanes(two_way())
                .successor(link(1, ContactPoint::End))
                .build(),
        ],
        vec![],
    )
}

/// Road 1 running east ends in junction 100, which turns left onto road 20 through road 10,
/// carries straight on to road 21 through road 11, and turns right onto road 22 through road 12.
pub fn t_junction() -> RoadNetwork {
    junction_network(vec![1.0, 1.0, 1.0])
}

/// As [`t_junction`] with the right turn weighted out.
pub fn weighted_junction() -> RoadNetwork {
    junction_network(vec![1.0, 3.0, 0.0])
}

fn junction_network(weights: Vec<f64>) -> RoadNetwork {
    let turn_length = TURN_RADIUS_M * FRAC_PI_2;

    let connecting = |id: i32, exit_road: i32| {
        RoadBuilder::new(id)
            .junction(100)
            .start(100.0, 0.0, 0.0)
            .lanes(two_way())
            .predecessor(link(1, ContactPoint::End))
            .successor(link(exit_road, ContactPoint::Start))
    };

    let exit = |id: i32, x: f64, y: f64, hdg: f64, from: i32| {
        RoadBuilder::new(id)
            .start(x, y, hdg)
            .line(50.0)
            .lanes(two_way())
            .predecessor(link(from, ContactPoint::End))
            .build()
    };

    let connections = [10, 11, 12]
        .iter()
        .zip(weights.iter())
        .map(|(&id, &w)| Connection::new(1, id, ContactPoint::Start).with_weight(w))
        .collect();

    network(
        vec![
            RoadBuilder::new(1)
                .line(100.0)
                .lanes(two_way())
                .successor(LinkTarget::Junction { id: 100 })
                .build(),
            connecting(10, 20)
                .arc(1.0 / TURN_RADIUS_M, turn_length)
                .build(),
            connecting(11, 21).line(20.0).build(),
            connecting(12, 22)
                .arc(-1.0 / TURN_RADIUS_M, turn_length)
                .build(),
            exit(20, 120.0, 20.0, FRAC_PI_2, 10),
            exit(21, 120.0, 0.0, 0.0, 11),
            exit(22, 120.0, -20.0, -FRAC_PI_2, 12),
        ],
        vec![Junction {
            id: 100,
            name: "t".into(),
            connections,
        }],
    )
}

/// Single 100 m road with three right lanes for its first 50 m and one after. Lane -2 merges into
/// lane -1 of the second section, lane -3 ends.
pub fn lane_drop() -> RoadNetwork {
    network(
        vec![RoadBuilder::new(1)
            .line(100.0)
            .lanes(vec![
                Lane::driving(-3, LANE_WIDTH_M),
                Lane::driving(-2, LANE_WIDTH_M).with_link(None, Some(-1)),
                Lane::driving(-1, LANE_WIDTH_M),
                Lane::driving(1, LANE_WIDTH_M),
            ])
            .lane_section(
                50.0,
                vec![Lane::driving(-1, LANE_WIDTH_M), Lane::driving(1, LANE_WIDTH_M)],
            )
            .build()],
        vec![],
    )
}
