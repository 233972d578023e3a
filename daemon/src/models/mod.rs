macro_rules! import_models {
    ($x:ident) => {
        mod $x;
        pub use self::$x::*;
    };
}

import_models!(archive);
import_models!(binary);
import_models!(build);
import_models!(builder);
import_models!(library_file);
import_models!(publication);
import_models!(queue);
import_models!(source);
