//! Real-time face redaction between a physical camera and a virtual camera.

pub mod shared {
    pub mod bounding_box;
    pub mod constants;
    pub mod error;
    pub mod frame;
    pub mod model_resolver;
    pub mod stream_format;
}

pub mod detection {
    pub mod domain {
        pub mod face_locator;
    }
    pub mod infrastructure;
}

pub mod blurring {
    pub mod domain {
        pub mod blur_params;
        pub mod region_redactor;
    }
    pub mod infrastructure;
}

pub mod video {
    pub mod domain {
        pub mod frame_pacer;
        pub mod frame_sink;
        pub mod frame_source;
    }
    pub mod infrastructure;
}

pub mod control {
    pub mod domain {
        pub mod control_action;
        pub mod control_surface;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod pipeline_config;
    pub mod pipeline_controller;
    pub mod pipeline_logger;
    pub mod pipeline_state;
}
